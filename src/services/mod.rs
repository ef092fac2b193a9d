pub mod deck_source;
pub mod swipe_recorder;
