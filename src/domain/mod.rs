pub mod answers;
pub mod deck;
pub mod models;
pub mod questionnaire;
pub mod shell;
pub mod survey;
