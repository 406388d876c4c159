use std::error::Error;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;
use vmioc::global;
use vmioc::prelude::*;

fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    global::register_instance_as::<String, String>(String::from("greeter"), Some("app_name"))?;
    global::register_as::<dyn Logger, ConsoleLogger>()?.single_instance();

    let window = global::new_child_container(Some("main-window"))?;
    let view_model = window.resolve::<MainViewModel>()?;
    view_model.show();

    global::reset()?;
    Ok(())
}

trait Logger: Send + Sync {
    fn log(&self, message: &str);
}

struct ConsoleLogger {
    app_name: Arc<String>,
}

#[injectable(implements(dyn Logger), dispose)]
impl ConsoleLogger {
    #[constructor]
    pub fn new(#[named("app_name")] app_name: Arc<String>) -> Self {
        Self { app_name }
    }
}

impl Logger for ConsoleLogger {
    fn log(&self, message: &str) {
        eprintln!("[{}] {}", self.app_name, message);
    }
}

impl Dispose for ConsoleLogger {
    fn dispose(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        eprintln!("[{}] logger closed", self.app_name);
        Ok(())
    }
}

trait Greeting: Send + Sync {
    fn text(&self) -> &'static str;
}

struct EnglishGreeting;

#[injectable(implements(dyn Greeting))]
impl EnglishGreeting {
    #[constructor]
    pub fn new() -> Self {
        Self
    }
}

impl Greeting for EnglishGreeting {
    fn text(&self) -> &'static str {
        "Hello World!"
    }
}

struct ChineseGreeting;

#[injectable(implements(dyn Greeting))]
impl ChineseGreeting {
    #[constructor]
    pub fn new() -> Self {
        Self
    }
}

impl Greeting for ChineseGreeting {
    fn text(&self) -> &'static str {
        "你好世界!"
    }
}

struct MainViewModel {
    logger: Arc<dyn Logger>,
    greetings: Vec<Arc<dyn Greeting>>,
}

#[injectable]
impl MainViewModel {
    #[constructor]
    pub fn new(logger: Arc<dyn Logger>, greetings: Vec<Arc<dyn Greeting>>) -> Self {
        Self { logger, greetings }
    }

    fn show(&self) {
        self.logger.log("Greetings from container-built view models:");
        for greeting in &self.greetings {
            self.logger.log(greeting.text());
        }
    }
}
