pub mod db;
pub mod model;

pub use db::{Backend, FileBackend, MemoryBackend, Store};
pub use model::{
    AboutContent, ContactContent, ContentDocument, Credential, DonateContent, HeroSlide,
    Initiative, Message, Program, PublicContent, VisionMission, VolunteerContent,
};
