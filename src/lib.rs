pub mod card;
pub mod config;
pub mod dates;
pub mod filter;
pub mod gantt;
pub mod i18n;
pub mod id;
pub mod model;
pub mod observer;
pub mod randomizer;
pub mod snapshot;
pub mod storage;
pub mod store;
pub mod templates;

pub use card::{Card, Dependency, DependencyKind, LogEntry, Priority};
pub use filter::{FilterCriteria, FilterManager};
pub use gantt::{GanttManager, ZoomLevel};
pub use model::{Board, Column, Label};
pub use store::{CardEntry, Store, StoreOptions};
