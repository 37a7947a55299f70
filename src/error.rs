use derive_more::{Display, Error};
use std::path::PathBuf;

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("could not load configuration")]
    Config,
    #[display("could not open image cache")]
    Open,
    #[display("invalid argument: {_0}")]
    Argument(#[error(not(source))] &'static str),
    #[display("could not read {}", _0.display())]
    Input(#[error(not(source))] PathBuf),
    #[display("image cache operation failed")]
    Cache,
}
