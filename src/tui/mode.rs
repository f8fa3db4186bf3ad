// state local to tui, mirrors keybinds
// and resolves them into semantic inputevents
// playing is synced from DisplayState per loop
#[derive(Clone, Debug, Default)]
pub struct TuiState {
    // modifier toggle: press once = on, press again = off
    // while on, the digit keys pick collections instead of samples
    pub collection_mode: bool,
    // synced from DisplayState each frame
    pub playing: bool,
}
