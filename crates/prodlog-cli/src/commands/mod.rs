pub mod backup;
pub mod doctor;
pub mod init;
pub mod notes;
pub mod runs;
pub mod technicians;
pub mod templates;
