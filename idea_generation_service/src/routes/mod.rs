pub mod generate_video_ideas;
pub mod health_check;

pub use generate_video_ideas::*;
pub use health_check::*;
