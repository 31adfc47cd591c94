pub mod delete;
pub mod remind;
pub mod status;
pub mod sync;

use acra_core::CalendarSync;
use acra_core::CancelToken;
use acra_core::preferences::FilePreferences;
use acra_core::store::DirStore;

pub type AcraSync = CalendarSync<DirStore, FilePreferences>;

/// Token that fires when the user hits Ctrl-C.
pub fn cancel_on_ctrl_c() -> CancelToken {
    let cancel = CancelToken::new();

    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, stopping after the current write");
            token.cancel();
        }
    });

    cancel
}
