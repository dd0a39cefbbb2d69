pub mod appointment;
pub mod claim;
pub mod enums;
pub mod modality;
pub mod options;

pub use appointment::*;
pub use claim::*;
pub use enums::*;
pub use modality::Modality;
