use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
  #[error("invalid argument: {0}")]
  InvalidArgument(&'static str),

  #[error("mapper is missing its map or unmap operation")]
  InvalidMapper,

  #[error("bitmap storage holds {have} words, {need} required")]
  InsufficientCapacity { have: usize, need: usize },

  #[error("operating system refused to map {size} bytes")]
  OutOfMemory { size: usize },
}
