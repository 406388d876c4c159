use std::error::Error;
use std::sync::Arc;

use vmioc::prelude::*;
use vmioc::types::Visibility;

pub trait Navigator: Send + Sync {}

pub trait Page: Send + Sync {}

pub struct Shell {
    _navigator: Arc<dyn Navigator>,
    _pages: Vec<Arc<dyn Page>>,
}

#[injectable(implements(dyn Navigator), dispose)]
impl Shell {
    #[constructor]
    pub fn new(navigator: Arc<dyn Navigator>) -> Self {
        Self::with_pages(navigator, Vec::new())
    }

    #[resolve_using]
    pub(crate) fn with_pages(
        #[named("root")] navigator: Arc<dyn Navigator>,
        pages: Vec<Arc<dyn Page>>,
    ) -> Self {
        Self {
            _navigator: navigator,
            _pages: pages,
        }
    }

    #[constructor]
    fn empty(
        navigator: Arc<dyn Navigator>,
        pages: Vec<Arc<dyn Page>>,
        _extra: Arc<String>,
    ) -> Self {
        Self::with_pages(navigator, pages)
    }
}

impl Navigator for Shell {}

impl Dispose for Shell {
    fn dispose(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        Ok(())
    }
}

fn main() {
    let info = Shell::type_info();
    let constructors = info.constructors();

    assert_eq!(constructors.len(), 3);
    assert_eq!(constructors[0].visibility(), Visibility::Public);
    assert_eq!(constructors[1].visibility(), Visibility::Internal);
    assert_eq!(constructors[2].visibility(), Visibility::Private);
    assert!(constructors[1].is_explicit());
    assert_eq!(constructors[1].parameters()[0].name(), Some("root"));
    assert!(constructors[1].parameters()[1].service().is_sequence());
    assert!(info.implements(std::any::TypeId::of::<dyn Navigator>()));
    assert!(info.disposer().is_some());
}
