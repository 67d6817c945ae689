// piglit-framework/src/tests/mock.rs
//
//! A platform and GL loader that live entirely in memory.

use crate::dispatch::ProcLoader;
use crate::info::{DispatchApi, GLApi, GLVersion};
use crate::platform::{ConfigRequest, Platform, PlatformKind, WindowEvent};
use crate::{Error, WindowingApiError};

use euclid::default::Size2D;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::ffi::CString;
use std::os::raw::{c_int, c_uint, c_void};
use std::ptr;
use std::rc::Rc;

struct CurrentContext {
    version: CString,
    extensions: Vec<CString>,
    extension_string: CString,
}

thread_local! {
    static CURRENT: RefCell<Option<CurrentContext>> = RefCell::new(None);
    static VIEWPORT: Cell<Option<(i32, i32, i32, i32)>> = Cell::new(None);
}

/// Makes a fake context current on this thread.
pub fn make_current(version: &str, extensions: &[String]) {
    let context = CurrentContext {
        version: CString::new(version).unwrap(),
        extensions: extensions.iter().map(|name| CString::new(name.as_str()).unwrap()).collect(),
        extension_string: CString::new(extensions.join(" ")).unwrap(),
    };
    CURRENT.with(|current| *current.borrow_mut() = Some(context));
}

pub fn clear_current() {
    CURRENT.with(|current| *current.borrow_mut() = None);
}

/// The last viewport set on this thread.
pub fn last_viewport() -> Option<(i32, i32, i32, i32)> {
    VIEWPORT.with(Cell::get)
}

extern "C" fn get_string(name: c_uint) -> *const u8 {
    CURRENT.with(|current| match *current.borrow() {
        Some(ref context) if name == glow::VERSION => context.version.as_ptr() as *const u8,
        Some(ref context) if name == glow::EXTENSIONS => {
            context.extension_string.as_ptr() as *const u8
        }
        _ => ptr::null(),
    })
}

extern "C" fn get_integerv(name: c_uint, value: *mut c_int) {
    if name != glow::NUM_EXTENSIONS {
        return;
    }
    let count = CURRENT.with(|current| current.borrow().as_ref().map_or(0, |c| c.extensions.len()));
    unsafe { *value = count as c_int }
}

extern "C" fn get_stringi(name: c_uint, index: c_uint) -> *const u8 {
    CURRENT.with(|current| match *current.borrow() {
        Some(ref context) if name == glow::EXTENSIONS => context
            .extensions
            .get(index as usize)
            .map_or(ptr::null(), |extension| extension.as_ptr() as *const u8),
        _ => ptr::null(),
    })
}

extern "C" fn viewport(x: c_int, y: c_int, width: c_int, height: c_int) {
    VIEWPORT.with(|viewport| viewport.set(Some((x, y, width, height))));
}

extern "C" fn debug_message_insert() {}

/// Hands out the fake entry points above. Anything else is missing.
pub struct MockLoader;

impl ProcLoader for MockLoader {
    fn get_core_proc(&self, name: &str, _: u32) -> *const c_void {
        match name {
            "glGetString" => get_string as *const c_void,
            "glGetIntegerv" => get_integerv as *const c_void,
            "glGetStringi" => get_stringi as *const c_void,
            "glViewport" => viewport as *const c_void,
            _ => ptr::null(),
        }
    }

    fn get_ext_proc(&self, name: &str) -> *const c_void {
        match name {
            "glDebugMessageInsertARB" => debug_message_insert as *const c_void,
            _ => ptr::null(),
        }
    }
}

pub struct MockConfig;

pub struct MockContext {
    version: String,
    extensions: Vec<String>,
}

pub struct MockDrawable {
    pub size: Size2D<i32>,
}

/// What the mock context reports for a request: a `GL_VERSION` string and extensions.
pub type Responder = Box<dyn Fn(&ConfigRequest) -> (String, Vec<String>)>;

/// One `create_context` call.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ContextRequest {
    pub api: GLApi,
    pub version: GLVersion,
    /// Contexts still alive when this one was requested.
    pub live_contexts: usize,
}

/// A platform whose resources are counters.
pub struct MockPlatform {
    pub kind: PlatformKind,
    pub live_configs: usize,
    pub live_contexts: usize,
    pub live_drawables: usize,
    pub requests: Vec<ContextRequest>,
    pub fail_config_for: Vec<GLApi>,
    pub fail_context: bool,
    pub fail_drawable: bool,
    pub fail_make_current: bool,
    pub events: VecDeque<WindowEvent>,
    pub shown: bool,
    pub swaps: usize,
    respond: Responder,
}

impl MockPlatform {
    /// A platform that gives every request exactly the version it asked for.
    pub fn new() -> MockPlatform {
        MockPlatform::with_responder(Box::new(|request: &ConfigRequest| {
            let version = if request.api.is_es() {
                format!("OpenGL ES {} Mock", request.version)
            } else {
                format!("{} Mock", request.version)
            };
            let extensions = match request.api {
                GLApi::Compatibility => vec!["GL_ARB_compatibility".to_owned()],
                _ => vec![],
            };
            (version, extensions)
        }))
    }

    pub fn with_responder(respond: Responder) -> MockPlatform {
        MockPlatform {
            kind: PlatformKind::Glx,
            live_configs: 0,
            live_contexts: 0,
            live_drawables: 0,
            requests: vec![],
            fail_config_for: vec![],
            fail_context: false,
            fail_drawable: false,
            fail_make_current: false,
            events: VecDeque::new(),
            shown: false,
            swaps: 0,
            respond,
        }
    }

    pub fn live_resources(&self) -> usize {
        self.live_configs + self.live_contexts + self.live_drawables
    }
}

impl Platform for MockPlatform {
    type Config = MockConfig;
    type Context = MockContext;
    type Drawable = MockDrawable;

    fn kind(&self) -> PlatformKind {
        self.kind
    }

    fn choose_config(&mut self, request: &ConfigRequest) -> Result<MockConfig, Error> {
        if self.fail_config_for.contains(&request.api) {
            return Err(Error::NoPixelFormatFound);
        }
        self.live_configs += 1;
        Ok(MockConfig)
    }

    fn create_context(
        &mut self,
        _: &MockConfig,
        request: &ConfigRequest,
    ) -> Result<MockContext, Error> {
        self.requests.push(ContextRequest {
            api: request.api,
            version: request.version,
            live_contexts: self.live_contexts,
        });
        if self.fail_context {
            return Err(Error::ContextCreationFailed(WindowingApiError::BadMatch));
        }
        let (version, extensions) = (self.respond)(request);
        self.live_contexts += 1;
        Ok(MockContext { version, extensions })
    }

    fn create_drawable(
        &mut self,
        _: &MockConfig,
        size: Size2D<i32>,
    ) -> Result<MockDrawable, Error> {
        if self.fail_drawable {
            return Err(Error::SurfaceCreationFailed(WindowingApiError::BadAlloc));
        }
        self.live_drawables += 1;
        Ok(MockDrawable { size })
    }

    fn make_current(&mut self, context: &MockContext, _: &MockDrawable) -> Result<(), Error> {
        if self.fail_make_current {
            return Err(Error::MakeCurrentFailed(WindowingApiError::BadContext));
        }
        make_current(&context.version, &context.extensions);
        Ok(())
    }

    fn swap_buffers(&mut self, _: &MockDrawable) -> Result<(), Error> {
        self.swaps += 1;
        Ok(())
    }

    fn destroy_drawable(&mut self, _: MockDrawable) {
        self.live_drawables -= 1;
    }

    fn destroy_context(&mut self, _: MockContext) {
        clear_current();
        self.live_contexts -= 1;
    }

    fn destroy_config(&mut self, _: MockConfig) {
        self.live_configs -= 1;
    }

    fn proc_loader(&self, _: DispatchApi) -> Rc<dyn ProcLoader> {
        Rc::new(MockLoader)
    }

    fn show_window(&mut self, _: &MockDrawable) -> Result<(), Error> {
        self.shown = true;
        Ok(())
    }

    fn next_event(&mut self, _: &MockDrawable) -> Option<WindowEvent> {
        self.events.pop_front()
    }
}
