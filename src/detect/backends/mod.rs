mod luma_blob;
mod scripted;

pub use luma_blob::LumaBlobBackend;
pub use scripted::ScriptedBackend;
