#![forbid(unsafe_code)]

pub mod app_services;
pub mod catalog_service;
pub mod driver;
pub mod error;
pub mod profile_service;
pub mod quiz_loop;

pub use quiz_core::Clock;

pub use app_services::AppServices;
pub use catalog_service::CatalogService;
pub use driver::{
    DriverEvent, DriverExit, IntervalTicks, ManualTickHandle, ManualTicks, QuizCommand,
    QuizDriver, TickSource,
};
pub use error::{AppServicesError, QuizServiceError};
pub use profile_service::{ProfileOverview, ProfileService};
pub use quiz_loop::{ActiveQuiz, DEFAULT_WRITE_TIMEOUT, QuizLoopService};
