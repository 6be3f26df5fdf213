pub mod matching;
pub mod parsing;
pub mod pretty_display;
pub mod value;
