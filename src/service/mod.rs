//! Services over the registry tables and prescriptions.

pub mod eraser;
pub mod prescriptions;
pub mod profiles;
pub mod rows;

pub use eraser::RecordEraser;
pub use prescriptions::PrescriptionService;
pub use profiles::ProfileService;
