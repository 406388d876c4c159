use std::convert::Infallible;
use std::fmt::{Display, Formatter, Result as FmtResult};

use vmioc::prelude::*;

pub struct Test1;

#[injectable]
impl Test1 {
    #[constructor]
    pub fn new() -> Self {
        Self
    }
}

pub struct Test2;

#[injectable]
impl Test2 {
    #[constructor]
    pub fn new() -> Test2 {
        Test2
    }
}

pub struct Test3;

#[injectable]
impl Test3 {
    #[constructor]
    pub fn new() -> Result<Self, Infallible> {
        Ok(Self)
    }
}

pub struct Test4;

#[injectable]
impl Test4 {
    #[constructor]
    pub fn new() -> std::result::Result<Test4, LoadError> {
        Err(LoadError)
    }
}

#[derive(Debug)]
pub struct LoadError;

impl Display for LoadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "could not load")
    }
}

impl std::error::Error for LoadError {}

fn main() {
    let container = Container::new();
    container.register::<Test1>().unwrap();
    container.register::<Test2>().unwrap();
    container.register::<Test3>().unwrap();
    container.register::<Test4>().unwrap();

    assert!(container.resolve::<Test1>().is_ok());
    assert!(container.resolve::<Test2>().is_ok());
    assert!(container.resolve::<Test3>().is_ok());
    assert!(container.resolve::<Test4>().is_err());
}
