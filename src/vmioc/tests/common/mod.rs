#![allow(dead_code)]

use std::error::Error;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use vmioc::prelude::*;

pub trait Clock: Send + Sync {
    fn now(&self) -> u64;
}

pub struct FixedClock;

#[injectable(implements(dyn Clock))]
impl FixedClock {
    #[constructor]
    pub fn new() -> Self {
        Self
    }
}

impl Clock for FixedClock {
    fn now(&self) -> u64 {
        1_700_000_000
    }
}

pub trait Repository: Send + Sync {
    fn name(&self) -> &'static str;
}

pub struct MemoryRepository;

#[injectable(implements(dyn Repository))]
impl MemoryRepository {
    #[constructor]
    pub fn new() -> Self {
        Self
    }
}

impl Repository for MemoryRepository {
    fn name(&self) -> &'static str {
        "memory"
    }
}

pub struct RemoteRepository {
    pub clock: Arc<dyn Clock>,
}

#[injectable(implements(dyn Repository))]
impl RemoteRepository {
    #[constructor]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

impl Repository for RemoteRepository {
    fn name(&self) -> &'static str {
        "remote"
    }
}

pub struct MainViewModel {
    pub clock: Arc<dyn Clock>,
    pub repositories: Vec<Arc<dyn Repository>>,
    pub built_with: &'static str,
}

#[injectable]
impl MainViewModel {
    #[constructor]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            repositories: Vec::new(),
            built_with: "new",
        }
    }

    #[constructor]
    pub fn with_repositories(
        clock: Arc<dyn Clock>,
        repositories: Vec<Arc<dyn Repository>>,
    ) -> Self {
        Self {
            clock,
            repositories,
            built_with: "with_repositories",
        }
    }

    #[constructor]
    fn for_preview(
        clock: Arc<dyn Clock>,
        repositories: Vec<Arc<dyn Repository>>,
        _journal: Arc<Journal>,
    ) -> Self {
        Self {
            clock,
            repositories,
            built_with: "for_preview",
        }
    }
}

pub struct SettingsViewModel {
    pub path: Arc<String>,
}

#[injectable]
impl SettingsViewModel {
    #[resolve_using]
    pub(crate) fn from_path(#[named("settings-path")] path: Arc<String>) -> Self {
        Self { path }
    }

    #[constructor]
    pub fn with_clock(_clock: Arc<dyn Clock>, _repository: Arc<dyn Repository>) -> Self {
        Self {
            path: Arc::new(String::from("<unused>")),
        }
    }
}

pub struct ConnectionSettings {
    pub reachable: bool,
}

#[derive(Debug)]
pub struct ConnectionRefused;

impl Display for ConnectionRefused {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "connection refused")
    }
}

impl Error for ConnectionRefused {}

pub struct Connection;

#[injectable]
impl Connection {
    #[constructor]
    pub fn open(settings: Arc<ConnectionSettings>) -> Result<Self, ConnectionRefused> {
        if settings.reachable {
            Ok(Self)
        } else {
            Err(ConnectionRefused)
        }
    }
}

/// Counts sessions built and disposed.
#[derive(Default)]
pub struct Journal {
    created: AtomicUsize,
    disposed: AtomicUsize,
}

impl Journal {
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn disposed(&self) -> usize {
        self.disposed.load(Ordering::SeqCst)
    }
}

pub struct Session {
    journal: Arc<Journal>,
}

#[injectable(dispose)]
impl Session {
    #[constructor]
    pub fn new(journal: Arc<Journal>) -> Self {
        journal.created.fetch_add(1, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(10));
        Self { journal }
    }
}

impl Dispose for Session {
    fn dispose(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.journal.disposed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct Socket;

#[injectable(dispose)]
impl Socket {
    #[constructor]
    pub fn new() -> Self {
        Self
    }
}

impl Dispose for Socket {
    fn dispose(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        Err("socket already closed".into())
    }
}

pub struct Ping {
    pub pong: Arc<Pong>,
}

#[injectable]
impl Ping {
    #[constructor]
    pub fn new(pong: Arc<Pong>) -> Self {
        Self { pong }
    }
}

pub struct Pong {
    pub ping: Arc<Ping>,
}

#[injectable]
impl Pong {
    #[constructor]
    pub fn new(ping: Arc<Ping>) -> Self {
        Self { ping }
    }
}

pub struct Splitter;

#[injectable]
impl Splitter {
    #[resolve_using]
    pub fn horizontal() -> Self {
        Self
    }

    #[resolve_using]
    pub fn vertical(_clock: Arc<dyn Clock>) -> Self {
        Self
    }
}

pub fn catalog() -> Arc<TypeCatalog> {
    let catalog = TypeCatalog::new();
    catalog
        .add::<FixedClock>()
        .add::<MemoryRepository>()
        .add::<RemoteRepository>()
        .add::<MainViewModel>()
        .add::<SettingsViewModel>()
        .add::<Connection>()
        .add::<Session>()
        .add::<Socket>()
        .add::<Ping>()
        .add::<Pong>()
        .add::<Splitter>();
    Arc::new(catalog)
}

pub fn container() -> Container {
    container_with(ContainerOptions::default())
}

pub fn container_with(options: ContainerOptions) -> Container {
    Container::builder()
        .types(catalog())
        .options(options)
        .build()
        .unwrap()
}
