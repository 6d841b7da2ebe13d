mod pdf_tables;
mod run;
mod word_tables;

pub use run::run;
