pub mod dispatcher;
pub mod event;
pub mod run;
pub mod store;

pub use dispatcher::{DispatchError, Dispatcher};
pub use event::{LogLevel, ProgressEvent, ProgressSnapshot};
pub use run::{CampaignReport, CampaignRun, RunState, StartError};
pub use store::CampaignStore;
