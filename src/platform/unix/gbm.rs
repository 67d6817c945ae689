// piglit-framework/src/platform/unix/gbm.rs
//
//! A GBM device on a DRM render node, loaded from `libgbm` at runtime.

use crate::platform::egl::device::LibraryWrapper;
use crate::platform::DmaBuf;
use crate::result::TestResult;
use crate::{Error, WindowingApiError};

use euclid::default::Size2D;
use std::cell::Cell;
use std::mem;
use std::os::raw::{c_int, c_void};
use std::ptr;
use std::sync::LazyLock;

pub(crate) enum GbmDeviceOpaque {}
pub(crate) enum GbmSurfaceOpaque {}
pub(crate) enum GbmBoOpaque {}

const GBM_BO_USE_SCANOUT: u32 = 1 << 0;
const GBM_BO_USE_RENDERING: u32 = 1 << 2;
const GBM_BO_USE_LINEAR: u32 = 1 << 4;
const GBM_BO_TRANSFER_WRITE: u32 = 1 << 1;

/// Device nodes tried in order.
const RENDER_NODES: [&str; 2] = ["/dev/dri/renderD128", "/dev/dri/card0"];

static GBM_LIBRARY: LazyLock<LibraryWrapper> =
    LazyLock::new(|| LibraryWrapper::open(&[c"libgbm.so.1", c"libgbm.so"]));

#[allow(non_snake_case)]
struct GbmFunctions {
    CreateDevice: unsafe extern "C" fn(fd: c_int) -> *mut GbmDeviceOpaque,
    DeviceDestroy: unsafe extern "C" fn(device: *mut GbmDeviceOpaque),
    SurfaceCreate: unsafe extern "C" fn(
        device: *mut GbmDeviceOpaque,
        width: u32,
        height: u32,
        format: u32,
        flags: u32,
    ) -> *mut GbmSurfaceOpaque,
    SurfaceDestroy: unsafe extern "C" fn(surface: *mut GbmSurfaceOpaque),
    SurfaceLockFrontBuffer: unsafe extern "C" fn(surface: *mut GbmSurfaceOpaque) -> *mut GbmBoOpaque,
    SurfaceReleaseBuffer: unsafe extern "C" fn(surface: *mut GbmSurfaceOpaque, bo: *mut GbmBoOpaque),
    BoCreate: unsafe extern "C" fn(
        device: *mut GbmDeviceOpaque,
        width: u32,
        height: u32,
        format: u32,
        flags: u32,
    ) -> *mut GbmBoOpaque,
    BoDestroy: unsafe extern "C" fn(bo: *mut GbmBoOpaque),
    BoGetFd: unsafe extern "C" fn(bo: *mut GbmBoOpaque) -> c_int,
    BoGetStride: unsafe extern "C" fn(bo: *mut GbmBoOpaque) -> u32,
    BoMap: unsafe extern "C" fn(
        bo: *mut GbmBoOpaque,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        flags: u32,
        stride: *mut u32,
        map_data: *mut *mut c_void,
    ) -> *mut c_void,
    BoUnmap: unsafe extern "C" fn(bo: *mut GbmBoOpaque, map_data: *mut c_void),
}

static GBM_FUNCTIONS: LazyLock<Option<GbmFunctions>> = LazyLock::new(|| unsafe {
    macro_rules! get {
        ($name:expr) => {{
            let symbol = GBM_LIBRARY.symbol($name);
            if symbol.is_null() {
                debug!("libgbm lacks {}", $name);
                return None;
            }
            mem::transmute(symbol)
        }};
    }
    Some(GbmFunctions {
        CreateDevice: get!("gbm_create_device"),
        DeviceDestroy: get!("gbm_device_destroy"),
        SurfaceCreate: get!("gbm_surface_create"),
        SurfaceDestroy: get!("gbm_surface_destroy"),
        SurfaceLockFrontBuffer: get!("gbm_surface_lock_front_buffer"),
        SurfaceReleaseBuffer: get!("gbm_surface_release_buffer"),
        BoCreate: get!("gbm_bo_create"),
        BoDestroy: get!("gbm_bo_destroy"),
        BoGetFd: get!("gbm_bo_get_fd"),
        BoGetStride: get!("gbm_bo_get_stride"),
        BoMap: get!("gbm_bo_map"),
        BoUnmap: get!("gbm_bo_unmap"),
    })
});

/// A GBM device and the file descriptor it was opened on.
pub(crate) struct GbmDevice {
    pub(crate) device: *mut GbmDeviceOpaque,
    fd: c_int,
    functions: &'static GbmFunctions,
}

impl Drop for GbmDevice {
    fn drop(&mut self) {
        unsafe {
            (self.functions.DeviceDestroy)(self.device);
            libc::close(self.fd);
        }
    }
}

/// A GBM surface with the buffer currently locked for scanout, if any.
pub(crate) struct GbmSurface {
    pub(crate) surface: *mut GbmSurfaceOpaque,
    front_buffer: Cell<Option<*mut GbmBoOpaque>>,
}

impl GbmDevice {
    /// Opens the first DRM node that yields a GBM device.
    pub(crate) fn open() -> Result<GbmDevice, Error> {
        let functions = match *GBM_FUNCTIONS {
            Some(ref functions) => functions,
            None => {
                error!("failed to load libgbm");
                return Err(Error::UnsupportedOnThisPlatform);
            }
        };

        for path in RENDER_NODES {
            let c_path = match std::ffi::CString::new(path) {
                Ok(c_path) => c_path,
                Err(_) => continue,
            };
            unsafe {
                let fd = libc::open(c_path.as_ptr(), libc::O_RDWR | libc::O_CLOEXEC);
                if fd < 0 {
                    debug!("failed to open {}", path);
                    continue;
                }
                let device = (functions.CreateDevice)(fd);
                if device.is_null() {
                    libc::close(fd);
                    continue;
                }
                debug!("opened GBM device on {}", path);
                return Ok(GbmDevice { device, fd, functions });
            }
        }

        error!("failed to open a GBM device");
        Err(Error::ConnectionFailed)
    }

    pub(crate) fn create_surface(&self, size: Size2D<i32>, format: u32) -> Result<GbmSurface, Error> {
        unsafe {
            let surface = (self.functions.SurfaceCreate)(
                self.device,
                size.width as u32,
                size.height as u32,
                format,
                GBM_BO_USE_SCANOUT | GBM_BO_USE_RENDERING,
            );
            if surface.is_null() {
                return Err(Error::SurfaceCreationFailed(WindowingApiError::BadAlloc));
            }
            Ok(GbmSurface { surface, front_buffer: Cell::new(None) })
        }
    }

    /// Locks the buffer that was just swapped to the front and releases the previous one.
    ///
    /// Without this a GBM surface runs out of buffers after a couple of swaps.
    pub(crate) fn advance_front_buffer(&self, surface: &GbmSurface) {
        unsafe {
            let buffer = (self.functions.SurfaceLockFrontBuffer)(surface.surface);
            if let Some(previous) = surface.front_buffer.take() {
                (self.functions.SurfaceReleaseBuffer)(surface.surface, previous);
            }
            if !buffer.is_null() {
                surface.front_buffer.set(Some(buffer));
            }
        }
    }

    pub(crate) fn destroy_surface(&self, surface: GbmSurface) {
        unsafe {
            if let Some(buffer) = surface.front_buffer.take() {
                (self.functions.SurfaceReleaseBuffer)(surface.surface, buffer);
            }
            (self.functions.SurfaceDestroy)(surface.surface);
        }
    }

    /// Allocates a linear buffer, copies `data` into it row by row and exports it.
    pub(crate) fn create_dma_buf(
        &self,
        width: u32,
        height: u32,
        fourcc: u32,
        data: &[u8],
        src_stride: u32,
    ) -> Result<DmaBuf, TestResult> {
        if (src_stride as usize) * (height as usize) > data.len() {
            error!("dma-buf source data is smaller than {} rows of {} bytes", height, src_stride);
            return Err(TestResult::Fail);
        }

        unsafe {
            let bo = (self.functions.BoCreate)(
                self.device,
                width,
                height,
                fourcc,
                GBM_BO_USE_RENDERING | GBM_BO_USE_LINEAR,
            );
            if bo.is_null() {
                info!("GBM can't allocate a {}x{} buffer of format 0x{:08x}", width, height, fourcc);
                return Err(TestResult::Skip);
            }

            let (mut dst_stride, mut map_data) = (0, ptr::null_mut());
            let map = (self.functions.BoMap)(
                bo,
                0,
                0,
                width,
                height,
                GBM_BO_TRANSFER_WRITE,
                &mut dst_stride,
                &mut map_data,
            );
            if map.is_null() {
                (self.functions.BoDestroy)(bo);
                error!("failed to map the GBM buffer");
                return Err(TestResult::Fail);
            }
            let row_length = src_stride.min(dst_stride) as usize;
            for row in 0..height as usize {
                ptr::copy_nonoverlapping(
                    data.as_ptr().add(row * src_stride as usize),
                    (map as *mut u8).add(row * dst_stride as usize),
                    row_length,
                );
            }
            (self.functions.BoUnmap)(bo, map_data);

            let fd = (self.functions.BoGetFd)(bo);
            if fd < 0 {
                (self.functions.BoDestroy)(bo);
                error!("failed to export the GBM buffer");
                return Err(TestResult::Fail);
            }
            Ok(DmaBuf {
                fd,
                width,
                height,
                stride: (self.functions.BoGetStride)(bo),
                offset: 0,
                fourcc,
                handle: bo as usize,
            })
        }
    }

    pub(crate) fn destroy_dma_buf(&self, buffer: DmaBuf) {
        unsafe {
            libc::close(buffer.fd);
            (self.functions.BoDestroy)(buffer.handle as *mut GbmBoOpaque);
        }
    }
}
