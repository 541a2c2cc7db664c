//! doc-narrator: extract text from images, PDFs, Word documents and plain
//! text files, summarize it, and read the summary aloud with the spoken
//! sentence highlighted.

pub mod app;
pub mod config;
pub mod extract;
pub mod narration;
pub mod summarize;
