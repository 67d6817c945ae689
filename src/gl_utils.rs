// piglit-framework/src/gl_utils.rs
//
//! The few GL calls the harness makes on its own behalf.

use crate::config::Visual;
use crate::dispatch::{DispatchTable, Gate, ProcLoader};
use crate::info::GLInfo;
use crate::result::TestResult;
use crate::Error;

use euclid::default::Size2D;
use glow::{Context as Gl, HasContext, NativeFramebuffer, NativeRenderbuffer};
use std::os::raw::c_int;

/// Sets the viewport through the dispatch table.
pub(crate) fn viewport(dispatch: &mut DispatchTable, size: Size2D<i32>) -> Result<(), TestResult> {
    type Viewport = unsafe extern "C" fn(c_int, c_int, c_int, c_int);
    unsafe {
        let viewport: Viewport = dispatch.resolve_as("glViewport", Gate::Core(10))?;
        viewport(0, 0, size.width, size.height);
    }
    Ok(())
}

enum Renderbuffers {
    IndividualDepthStencil {
        depth: Option<NativeRenderbuffer>,
        stencil: Option<NativeRenderbuffer>,
    },
    CombinedDepthStencil(NativeRenderbuffer),
}

/// An off-screen framebuffer standing in for the window's default framebuffer.
pub struct WinsysFbo {
    gl: Gl,
    framebuffer: NativeFramebuffer,
    color: NativeRenderbuffer,
    renderbuffers: Renderbuffers,
}

impl WinsysFbo {
    /// Builds a framebuffer object matching `visual` and `samples` and binds it.
    ///
    /// Needs framebuffer objects in core (GL 3.0, GL ES 2.0) or through
    /// `GL_ARB_framebuffer_object`.
    pub(crate) fn new(
        loader: &dyn ProcLoader,
        info: &GLInfo,
        size: Size2D<i32>,
        visual: Visual,
        samples: u32,
    ) -> Result<WinsysFbo, Error> {
        let has_fbo = if info.is_es {
            info.version >= 20
        } else {
            info.version >= 30 || info.has_extension("GL_ARB_framebuffer_object")
        };
        if !has_fbo {
            return Err(Error::RequiredExtensionUnavailable("GL_ARB_framebuffer_object"));
        }
        for name in ["glGenFramebuffers", "glFramebufferRenderbuffer", "glCheckFramebufferStatus"] {
            if loader.get_core_proc(name, 30).is_null() {
                return Err(Error::GLFunctionNotFound(name.to_owned()));
            }
        }

        unsafe {
            let gl = Gl::from_loader_function(|name| loader.get_core_proc(name, 30));

            let framebuffer = gl.create_framebuffer().map_err(|_| Error::Failed)?;
            gl.bind_framebuffer(glow::FRAMEBUFFER, Some(framebuffer));

            let color = gl.create_renderbuffer().map_err(|_| Error::Failed)?;
            gl.bind_renderbuffer(glow::RENDERBUFFER, Some(color));
            renderbuffer_storage(&gl, samples, glow::RGBA8, size);
            gl.framebuffer_renderbuffer(
                glow::FRAMEBUFFER,
                glow::COLOR_ATTACHMENT0,
                glow::RENDERBUFFER,
                Some(color),
            );

            let renderbuffers = Renderbuffers::new(&gl, size, visual, samples)?;
            renderbuffers.bind_to_current_framebuffer(&gl);
            gl.bind_renderbuffer(glow::RENDERBUFFER, None);

            let status = gl.check_framebuffer_status(glow::FRAMEBUFFER);
            let fbo = WinsysFbo { gl, framebuffer, color, renderbuffers };
            if status != glow::FRAMEBUFFER_COMPLETE {
                error!("off-screen framebuffer incomplete (0x{:04x})", status);
                fbo.destroy();
                return Err(Error::FramebufferIncomplete(status));
            }
            Ok(fbo)
        }
    }

    /// The GL name of the framebuffer, for tests that bind it back after drawing elsewhere.
    #[inline]
    pub fn name(&self) -> u32 {
        self.framebuffer.0.get()
    }

    /// Binds the framebuffer for drawing and reading.
    pub fn bind(&self) {
        unsafe {
            self.gl.bind_framebuffer(glow::FRAMEBUFFER, Some(self.framebuffer));
        }
    }

    pub(crate) fn destroy(self) {
        unsafe {
            self.gl.bind_framebuffer(glow::FRAMEBUFFER, None);
            self.renderbuffers.destroy(&self.gl);
            self.gl.delete_renderbuffer(self.color);
            self.gl.delete_framebuffer(self.framebuffer);
        }
    }
}

impl Renderbuffers {
    unsafe fn new(
        gl: &Gl,
        size: Size2D<i32>,
        visual: Visual,
        samples: u32,
    ) -> Result<Renderbuffers, Error> {
        if visual.contains(Visual::DEPTH | Visual::STENCIL) {
            let renderbuffer = gl.create_renderbuffer().map_err(|_| Error::Failed)?;
            gl.bind_renderbuffer(glow::RENDERBUFFER, Some(renderbuffer));
            renderbuffer_storage(gl, samples, glow::DEPTH24_STENCIL8, size);
            return Ok(Renderbuffers::CombinedDepthStencil(renderbuffer));
        }

        let (mut depth, mut stencil) = (None, None);
        if visual.contains(Visual::DEPTH) {
            let renderbuffer = gl.create_renderbuffer().map_err(|_| Error::Failed)?;
            gl.bind_renderbuffer(glow::RENDERBUFFER, Some(renderbuffer));
            renderbuffer_storage(gl, samples, glow::DEPTH_COMPONENT24, size);
            depth = Some(renderbuffer);
        }
        if visual.contains(Visual::STENCIL) {
            let renderbuffer = gl.create_renderbuffer().map_err(|_| Error::Failed)?;
            gl.bind_renderbuffer(glow::RENDERBUFFER, Some(renderbuffer));
            renderbuffer_storage(gl, samples, glow::STENCIL_INDEX8, size);
            stencil = Some(renderbuffer);
        }
        Ok(Renderbuffers::IndividualDepthStencil { depth, stencil })
    }

    unsafe fn bind_to_current_framebuffer(&self, gl: &Gl) {
        match *self {
            Renderbuffers::CombinedDepthStencil(renderbuffer) => {
                gl.framebuffer_renderbuffer(
                    glow::FRAMEBUFFER,
                    glow::DEPTH_STENCIL_ATTACHMENT,
                    glow::RENDERBUFFER,
                    Some(renderbuffer),
                );
            }
            Renderbuffers::IndividualDepthStencil { depth, stencil } => {
                if depth.is_some() {
                    gl.framebuffer_renderbuffer(
                        glow::FRAMEBUFFER,
                        glow::DEPTH_ATTACHMENT,
                        glow::RENDERBUFFER,
                        depth,
                    );
                }
                if stencil.is_some() {
                    gl.framebuffer_renderbuffer(
                        glow::FRAMEBUFFER,
                        glow::STENCIL_ATTACHMENT,
                        glow::RENDERBUFFER,
                        stencil,
                    );
                }
            }
        }
    }

    unsafe fn destroy(self, gl: &Gl) {
        match self {
            Renderbuffers::CombinedDepthStencil(renderbuffer) => {
                gl.delete_renderbuffer(renderbuffer);
            }
            Renderbuffers::IndividualDepthStencil { depth, stencil } => {
                if let Some(depth) = depth {
                    gl.delete_renderbuffer(depth);
                }
                if let Some(stencil) = stencil {
                    gl.delete_renderbuffer(stencil);
                }
            }
        }
    }
}

unsafe fn renderbuffer_storage(gl: &Gl, samples: u32, format: u32, size: Size2D<i32>) {
    if samples > 1 {
        gl.renderbuffer_storage_multisample(
            glow::RENDERBUFFER,
            samples as i32,
            format,
            size.width,
            size.height,
        );
    } else {
        gl.renderbuffer_storage(glow::RENDERBUFFER, format, size.width, size.height);
    }
}
