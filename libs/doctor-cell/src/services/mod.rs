pub mod directory;
pub mod matching;

pub use directory::DoctorDirectoryService;
pub use matching::DoctorMatchingService;
