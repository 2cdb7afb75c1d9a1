//! Windows backends: UI Automation, window and monitor enumeration, the
//! low-level mouse hook and the layered overlay window.

use crate::error::OverlayError;
use crate::geometry::{CoordinateConverter, Display, Point, ScreenRect};
use crate::model::AppId;
use crate::overlay::hover::{PointerEvent, PointerHookBackend};
use crate::overlay::render::{convert_rgba_to_dib_bgra, render_to_rgba, DrawList, OVERLAY_COLORKEY};
use crate::overlay::surface::SurfaceBackend;
use crate::platform::{ElementHandle, WindowInfo};
use anyhow::anyhow;
use once_cell::sync::{Lazy, OnceCell};
use std::collections::HashMap;
use std::ffi::OsString;
use std::mem;
use std::ops::Range;
use std::os::windows::ffi::OsStringExt;
use std::path::Path;
use std::ptr;
use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};
use std::sync::{Mutex, Once};
use std::time::Duration;
use tracing::{debug, warn};
use windows::core::{PCWSTR, PWSTR};
use windows::Win32::Foundation::{
    CloseHandle, BOOL, COLORREF, HANDLE, HWND, LPARAM, LRESULT, POINT, RECT, WPARAM,
};
use windows::Win32::Graphics::Gdi::{
    BeginPaint, BitBlt, CreateCompatibleDC, CreateDIBSection, DeleteDC, DeleteObject, EndPaint,
    EnumDisplayMonitors, GetMonitorInfoW, InvalidateRect, SelectObject, BITMAPINFO,
    BITMAPINFOHEADER, BI_RGB, DIB_RGB_COLORS, HBITMAP, HDC, HGDIOBJ, HMONITOR, MONITORINFO,
    PAINTSTRUCT, SRCCOPY,
};
use windows::Win32::System::Com::{
    CoCreateInstance, CoInitializeEx, CLSCTX_INPROC_SERVER, COINIT_APARTMENTTHREADED,
};
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::System::Ole::{
    SafeArrayAccessData, SafeArrayDestroy, SafeArrayGetLBound, SafeArrayGetUBound,
    SafeArrayUnaccessData,
};
use windows::Win32::System::Threading::{
    GetCurrentThreadId, OpenProcess, QueryFullProcessImageNameW, PROCESS_NAME_FORMAT,
    PROCESS_QUERY_LIMITED_INFORMATION,
};
use windows::Win32::UI::Accessibility::{
    CUIAutomation, IUIAutomation, IUIAutomationElement, IUIAutomationTextPattern,
    TextPatternRangeEndpoint_End, TextPatternRangeEndpoint_Start, TextUnit_Character,
    UIA_TextPatternId,
};
use windows::Win32::UI::WindowsAndMessaging::{
    CallNextHookEx, CreateWindowExW, DefWindowProcW, DestroyWindow, DispatchMessageW,
    EnumWindows, GetCursorPos, GetMessageW, GetWindowLongPtrW, GetWindowRect, GetWindowTextW,
    GetWindowThreadProcessId, IsWindowVisible, PeekMessageW, PostThreadMessageW, RegisterClassW,
    SetLayeredWindowAttributes, SetWindowLongPtrW, SetWindowPos, SetWindowsHookExW, ShowWindow,
    TranslateMessage, UnhookWindowsHookEx, GWLP_USERDATA, GWL_EXSTYLE, HC_ACTION, HHOOK,
    HWND_TOPMOST, LWA_COLORKEY, MA_NOACTIVATE, MONITORINFOF_PRIMARY, MSG, MSLLHOOKSTRUCT,
    PM_NOREMOVE, PM_REMOVE, SWP_NOACTIVATE, SWP_NOMOVE, SWP_NOSIZE, SWP_SHOWWINDOW, SW_HIDE,
    WH_MOUSE_LL, WINDOW_EX_STYLE, WINDOW_STYLE, WM_ERASEBKGND, WM_LBUTTONDOWN, WM_LBUTTONUP,
    WM_MOUSEACTIVATE, WM_MOUSEMOVE, WM_PAINT, WM_QUIT, WNDCLASSW, WS_EX_LAYERED,
    WS_EX_NOACTIVATE, WS_EX_TOOLWINDOW, WS_EX_TOPMOST, WS_EX_TRANSPARENT, WS_POPUP,
};

fn rect_from_win32(rect: RECT) -> ScreenRect {
    ScreenRect::window_manager(
        rect.left as f64,
        rect.top as f64,
        (rect.right - rect.left) as f64,
        (rect.bottom - rect.top) as f64,
    )
}

fn widestring(value: &str) -> Vec<u16> {
    use std::os::windows::ffi::OsStrExt;
    std::ffi::OsStr::new(value)
        .encode_wide()
        .chain(std::iter::once(0))
        .collect()
}

pub fn cursor_position() -> Option<Point> {
    let mut point = POINT::default();
    unsafe { GetCursorPos(&mut point) }
        .ok()
        .map(|_| Point::new(point.x as f64, point.y as f64))
}

/// Visible top-level windows. Topmost windows report layer 3.
pub fn enumerate_windows() -> Vec<WindowInfo> {
    unsafe extern "system" fn enum_cb(hwnd: HWND, lparam: LPARAM) -> BOOL {
        let windows = &mut *(lparam.0 as *mut Vec<WindowInfo>);
        if !IsWindowVisible(hwnd).as_bool() {
            return BOOL(1);
        }
        let mut rect = RECT::default();
        if GetWindowRect(hwnd, &mut rect).is_err() {
            return BOOL(1);
        }
        let mut pid = 0u32;
        let _ = GetWindowThreadProcessId(hwnd, Some(&mut pid));
        if pid == 0 {
            return BOOL(1);
        }
        let ex_style = GetWindowLongPtrW(hwnd, GWL_EXSTYLE) as u32;
        let layer = if ex_style & WS_EX_TOPMOST.0 != 0 { 3 } else { 0 };

        let mut title_buf = vec![0u16; 512];
        let len = GetWindowTextW(hwnd, &mut title_buf).max(0) as usize;
        windows.push(WindowInfo {
            frame: rect_from_win32(rect),
            pid,
            layer,
            title: String::from_utf16_lossy(&title_buf[..len]),
        });
        BOOL(1)
    }

    let mut windows = Vec::new();
    unsafe {
        let _ = EnumWindows(
            Some(enum_cb),
            LPARAM(&mut windows as *mut Vec<WindowInfo> as isize),
        );
    }
    windows
}

/// Monitors with frames flipped into canonical space against the primary height.
pub fn enumerate_displays() -> Vec<Display> {
    unsafe extern "system" fn enum_proc(
        monitor: HMONITOR,
        _hdc: HDC,
        _rect: *mut RECT,
        data: LPARAM,
    ) -> BOOL {
        let monitors = &mut *(data.0 as *mut Vec<(ScreenRect, bool)>);
        let mut info = MONITORINFO {
            cbSize: mem::size_of::<MONITORINFO>() as u32,
            ..Default::default()
        };
        if GetMonitorInfoW(monitor, &mut info).as_bool() {
            let primary = info.dwFlags & MONITORINFOF_PRIMARY != 0;
            monitors.push((rect_from_win32(info.rcMonitor), primary));
        }
        BOOL(1)
    }

    let mut monitors: Vec<(ScreenRect, bool)> = Vec::new();
    unsafe {
        let _ = EnumDisplayMonitors(
            HDC::default(),
            None,
            Some(enum_proc),
            LPARAM(&mut monitors as *mut Vec<(ScreenRect, bool)> as isize),
        );
    }

    let primary_height = monitors
        .iter()
        .find(|(_, primary)| *primary)
        .or_else(|| monitors.first())
        .map(|(frame, _)| frame.height)
        .unwrap_or(0.0);
    monitors
        .into_iter()
        .map(|(frame, primary)| {
            Display::new(CoordinateConverter::to_canonical(frame, primary_height), primary)
        })
        .collect()
}

/// Lowercased executable name of `pid`, e.g. `chrome.exe`.
pub fn app_id_for_pid(pid: u32) -> Option<AppId> {
    unsafe {
        let handle = OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, false, pid).ok()?;
        let mut buffer = vec![0u16; 1024];
        let mut size = buffer.len() as u32;
        let success = QueryFullProcessImageNameW(
            handle,
            PROCESS_NAME_FORMAT(0),
            PWSTR(buffer.as_mut_ptr()),
            &mut size,
        )
        .is_ok();
        let _ = CloseHandle(handle);
        if !success || size == 0 {
            return None;
        }
        let path = OsString::from_wide(&buffer[..size as usize]);
        Path::new(&path)
            .file_name()
            .map(|name| AppId::new(name.to_string_lossy()))
    }
}

/// UI Automation element for a foreign text control.
pub struct UiaElement {
    element: IUIAutomationElement,
    pid: u32,
}

impl UiaElement {
    /// The element that currently has keyboard focus, on any process.
    pub fn focused() -> anyhow::Result<Self> {
        unsafe {
            // S_FALSE when already initialized on this thread.
            let _ = CoInitializeEx(None, COINIT_APARTMENTTHREADED);
            let automation: IUIAutomation =
                CoCreateInstance(&CUIAutomation, None, CLSCTX_INPROC_SERVER)
                    .map_err(|e| anyhow!("create UIAutomation instance: {e}"))?;
            let element = automation
                .GetFocusedElement()
                .map_err(|e| anyhow!("get focused element: {e}"))?;
            let pid = element.CurrentProcessId().unwrap_or(0).max(0) as u32;
            Ok(Self { element, pid })
        }
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Whole document text, when the control exposes a text pattern.
    pub fn text(&self) -> Option<String> {
        let pattern = self.text_pattern().ok()?;
        unsafe {
            let range = pattern.DocumentRange().ok()?;
            range.GetText(-1).ok().map(|text| text.to_string())
        }
    }

    /// Lowercased executable name of the owning process.
    pub fn app_id(&self) -> Option<AppId> {
        app_id_for_pid(self.pid)
    }

    fn text_pattern(&self) -> Result<IUIAutomationTextPattern, OverlayError> {
        unsafe {
            self.element
                .GetCurrentPatternAs::<IUIAutomationTextPattern>(UIA_TextPatternId)
                .map_err(|e| OverlayError::unavailable(format!("no text pattern: {e}")))
        }
    }
}

impl ElementHandle for UiaElement {
    fn range_bounds(&self, range: Range<usize>) -> Result<ScreenRect, OverlayError> {
        let pattern = self.text_pattern()?;
        let unavailable = |e: windows::core::Error| OverlayError::unavailable(e.to_string());
        unsafe {
            let text_range = pattern.DocumentRange().map_err(unavailable)?;
            text_range
                .MoveEndpointByRange(
                    TextPatternRangeEndpoint_End,
                    &text_range,
                    TextPatternRangeEndpoint_Start,
                )
                .map_err(unavailable)?;
            let moved = text_range
                .Move(TextUnit_Character, range.start as i32)
                .map_err(unavailable)?;
            if moved as usize != range.start {
                return Err(OverlayError::unavailable(format!(
                    "text ends before offset {}",
                    range.start
                )));
            }
            text_range
                .MoveEndpointByUnit(
                    TextPatternRangeEndpoint_End,
                    TextUnit_Character,
                    range.len() as i32,
                )
                .map_err(unavailable)?;

            let array = text_range.GetBoundingRectangles().map_err(unavailable)?;
            if array.is_null() {
                return Err(OverlayError::unavailable("no bounding rectangles"));
            }
            let rects = read_rect_array(array);
            let _ = SafeArrayDestroy(array);

            rects
                .into_iter()
                .reduce(|a, b| a.union(&b))
                .ok_or_else(|| OverlayError::unavailable("empty bounding rectangles"))
        }
    }

    fn frame(&self) -> Option<ScreenRect> {
        unsafe { self.element.CurrentBoundingRectangle() }
            .ok()
            .map(rect_from_win32)
    }
}

/// Bounding rectangles arrive as a flat array of `left, top, width, height` doubles.
unsafe fn read_rect_array(array: *mut windows::Win32::System::Com::SAFEARRAY) -> Vec<ScreenRect> {
    let (Ok(lower), Ok(upper)) = (SafeArrayGetLBound(array, 1), SafeArrayGetUBound(array, 1)) else {
        return Vec::new();
    };
    let count = (upper - lower + 1).max(0) as usize;
    let mut data: *mut core::ffi::c_void = ptr::null_mut();
    if SafeArrayAccessData(array, &mut data).is_err() || data.is_null() {
        return Vec::new();
    }
    let values = std::slice::from_raw_parts(data as *const f64, count);
    let rects = values
        .chunks_exact(4)
        .map(|v| ScreenRect::window_manager(v[0], v[1], v[2], v[3]))
        .collect();
    let _ = SafeArrayUnaccessData(array);
    rects
}

struct HookThread {
    thread_id: u32,
    join: std::thread::JoinHandle<()>,
}

/// WH_MOUSE_LL hook on a dedicated thread with its own message loop.
#[derive(Default)]
pub struct DefaultPointerHook {
    hook_thread: Option<HookThread>,
}

static HOOK_SENDER: OnceCell<Mutex<Option<Sender<PointerEvent>>>> = OnceCell::new();

fn hook_sender() -> &'static Mutex<Option<Sender<PointerEvent>>> {
    HOOK_SENDER.get_or_init(|| Mutex::new(None))
}

impl PointerHookBackend for DefaultPointerHook {
    fn install(&mut self, sender: Sender<PointerEvent>) -> anyhow::Result<()> {
        if self.hook_thread.is_some() {
            return Ok(());
        }
        if let Ok(mut guard) = hook_sender().lock() {
            *guard = Some(sender);
        }

        let (ready_tx, ready_rx) = std::sync::mpsc::sync_channel::<anyhow::Result<u32>>(1);
        let join = std::thread::spawn(move || {
            let mut msg = MSG::default();
            unsafe {
                let _ = PeekMessageW(&mut msg, None, 0, 0, PM_NOREMOVE);
            }
            let thread_id = unsafe { GetCurrentThreadId() };

            let hmodule = match unsafe { GetModuleHandleW(None) } {
                Ok(h) => h,
                Err(e) => {
                    let _ = ready_tx.send(Err(anyhow!(e)));
                    return;
                }
            };
            let hook = match unsafe {
                SetWindowsHookExW(WH_MOUSE_LL, Some(mouse_hook_proc), hmodule, 0)
            } {
                Ok(h) if !h.0.is_null() => h,
                Ok(_) => {
                    let _ = ready_tx.send(Err(anyhow!(windows::core::Error::from_win32())));
                    return;
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(anyhow!(e)));
                    return;
                }
            };
            let _ = ready_tx.send(Ok(thread_id));

            loop {
                let r = unsafe { GetMessageW(&mut msg, None, 0, 0) };
                if r.0 == 0 || r.0 == -1 {
                    break;
                }
                unsafe {
                    let _ = TranslateMessage(&msg);
                    DispatchMessageW(&msg);
                }
            }
            unsafe {
                let _ = UnhookWindowsHookEx(hook);
            }
        });

        let thread_id = ready_rx
            .recv_timeout(Duration::from_secs(2))
            .map_err(|_| anyhow!("pointer hook thread did not signal readiness"))??;
        self.hook_thread = Some(HookThread { thread_id, join });
        Ok(())
    }

    fn uninstall(&mut self) -> anyhow::Result<()> {
        if let Ok(mut guard) = hook_sender().lock() {
            *guard = None;
        }
        if let Some(thread) = self.hook_thread.take() {
            unsafe {
                let _ = PostThreadMessageW(thread.thread_id, WM_QUIT, WPARAM(0), LPARAM(0));
            }
            let _ = thread.join.join();
        }
        Ok(())
    }

    fn is_installed(&self) -> bool {
        self.hook_thread.is_some()
    }
}

unsafe extern "system" fn mouse_hook_proc(n_code: i32, w_param: WPARAM, l_param: LPARAM) -> LRESULT {
    if n_code == HC_ACTION as i32 {
        let msg = w_param.0 as u32;
        if msg == WM_MOUSEMOVE || msg == WM_LBUTTONDOWN || msg == WM_LBUTTONUP {
            let info = &*(l_param.0 as *const MSLLHOOKSTRUCT);
            let point = Point::new(info.pt.x as f64, info.pt.y as f64);
            // Never block the system input thread on the interaction thread.
            if let Ok(guard) = hook_sender().try_lock() {
                if let Some(sender) = guard.as_ref() {
                    let event = match msg {
                        WM_MOUSEMOVE => PointerEvent::Moved(point),
                        WM_LBUTTONDOWN => PointerEvent::LeftDown(point),
                        _ => PointerEvent::LeftUp(point),
                    };
                    let _ = sender.send(event);
                }
            }
        }
    }
    CallNextHookEx(HHOOK(ptr::null_mut()), n_code, w_param, l_param)
}

static CLICK_SENDERS: Lazy<Mutex<HashMap<isize, Sender<Point>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

pub fn compose_overlay_window_ex_style(click_through: bool) -> WINDOW_EX_STYLE {
    let style = WS_EX_LAYERED | WS_EX_TOPMOST | WS_EX_TOOLWINDOW | WS_EX_NOACTIVATE;
    if click_through {
        style | WS_EX_TRANSPARENT
    } else {
        style
    }
}

fn colorkey() -> COLORREF {
    COLORREF(
        (OVERLAY_COLORKEY.r as u32)
            | ((OVERLAY_COLORKEY.g as u32) << 8)
            | ((OVERLAY_COLORKEY.b as u32) << 16),
    )
}

unsafe extern "system" fn overlay_wndproc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    match msg {
        WM_ERASEBKGND => LRESULT(1),
        WM_MOUSEACTIVATE => LRESULT(MA_NOACTIVATE as isize),
        WM_PAINT => {
            let mut ps = PAINTSTRUCT::default();
            let hdc = BeginPaint(hwnd, &mut ps);
            if !hdc.0.is_null() {
                let mem_dc = HDC(GetWindowLongPtrW(hwnd, GWLP_USERDATA) as *mut _);
                if !mem_dc.0.is_null() {
                    let _ = BitBlt(
                        hdc,
                        ps.rcPaint.left,
                        ps.rcPaint.top,
                        ps.rcPaint.right - ps.rcPaint.left,
                        ps.rcPaint.bottom - ps.rcPaint.top,
                        mem_dc,
                        ps.rcPaint.left,
                        ps.rcPaint.top,
                        SRCCOPY,
                    );
                }
            }
            let _ = EndPaint(hwnd, &ps);
            LRESULT(0)
        }
        WM_LBUTTONDOWN => {
            if let (Some(point), Ok(senders)) = (cursor_position(), CLICK_SENDERS.lock()) {
                if let Some(tx) = senders.get(&(hwnd.0 as isize)) {
                    let _ = tx.send(point);
                }
            }
            LRESULT(0)
        }
        _ => DefWindowProcW(hwnd, msg, wparam, lparam),
    }
}

fn pump_overlay_messages() {
    unsafe {
        let mut msg = MSG::default();
        while PeekMessageW(&mut msg, HWND::default(), 0, 0, PM_REMOVE).into() {
            let _ = TranslateMessage(&msg);
            let _ = DispatchMessageW(&msg);
        }
    }
}

/// Layered, topmost, non-activating popup with colorkey transparency.
pub struct LayeredSurface {
    hwnd: HWND,
    mem_dc: HDC,
    dib: HBITMAP,
    old_bitmap: HGDIOBJ,
    bits: *mut u8,
    size: (i32, i32),
    click_through: bool,
    clicks: Receiver<Point>,
}

unsafe impl Send for LayeredSurface {}

impl LayeredSurface {
    pub fn new(click_through: bool) -> anyhow::Result<Self> {
        static REGISTER_CLASS: Once = Once::new();
        let class_name = widestring("GrammarOverlaySurface");
        let hinstance = unsafe { GetModuleHandleW(PCWSTR::null()) }?;

        REGISTER_CLASS.call_once(|| unsafe {
            let wc = WNDCLASSW {
                hInstance: hinstance.into(),
                lpszClassName: PCWSTR(class_name.as_ptr()),
                lpfnWndProc: Some(overlay_wndproc),
                ..Default::default()
            };
            let _ = RegisterClassW(&wc);
        });

        let hwnd = unsafe {
            CreateWindowExW(
                compose_overlay_window_ex_style(click_through),
                PCWSTR(class_name.as_ptr()),
                PCWSTR::null(),
                WINDOW_STYLE(WS_POPUP.0),
                0,
                0,
                1,
                1,
                None,
                None,
                hinstance,
                None,
            )?
        };
        if let Err(err) = unsafe { SetLayeredWindowAttributes(hwnd, colorkey(), 0, LWA_COLORKEY) } {
            unsafe {
                let _ = DestroyWindow(hwnd);
            }
            return Err(anyhow!("configure layered window: {err}"));
        }

        let mem_dc = unsafe { CreateCompatibleDC(HDC::default()) };
        if mem_dc.0.is_null() {
            unsafe {
                let _ = DestroyWindow(hwnd);
            }
            return Err(anyhow!("create memory DC"));
        }
        unsafe {
            let _ = SetWindowLongPtrW(hwnd, GWLP_USERDATA, mem_dc.0 as isize);
        }

        let (tx, rx) = channel();
        if let Ok(mut senders) = CLICK_SENDERS.lock() {
            senders.insert(hwnd.0 as isize, tx);
        }

        Ok(Self {
            hwnd,
            mem_dc,
            dib: HBITMAP::default(),
            old_bitmap: HGDIOBJ::default(),
            bits: ptr::null_mut(),
            size: (0, 0),
            click_through,
            clicks: rx,
        })
    }

    fn release_bitmap(&mut self) {
        unsafe {
            if !self.dib.0.is_null() {
                let _ = SelectObject(self.mem_dc, self.old_bitmap);
                let _ = DeleteObject(self.dib);
            }
        }
        self.dib = HBITMAP::default();
        self.bits = ptr::null_mut();
        self.size = (0, 0);
    }

    fn ensure_bitmap(&mut self, width: i32, height: i32) -> anyhow::Result<()> {
        if self.size == (width, height) && !self.bits.is_null() {
            return Ok(());
        }
        self.release_bitmap();
        if width <= 0 || height <= 0 {
            return Ok(());
        }

        let mut bmi = BITMAPINFO::default();
        bmi.bmiHeader = BITMAPINFOHEADER {
            biSize: mem::size_of::<BITMAPINFOHEADER>() as u32,
            biWidth: width,
            biHeight: -height,
            biPlanes: 1,
            biBitCount: 32,
            biCompression: BI_RGB.0,
            ..Default::default()
        };
        let mut bits: *mut core::ffi::c_void = ptr::null_mut();
        let dib = unsafe {
            CreateDIBSection(self.mem_dc, &bmi, DIB_RGB_COLORS, &mut bits, HANDLE::default(), 0)?
        };
        if bits.is_null() {
            unsafe {
                let _ = DeleteObject(dib);
            }
            return Err(anyhow!("DIB section has no pixel buffer"));
        }
        self.old_bitmap = unsafe { SelectObject(self.mem_dc, dib) };
        self.dib = dib;
        self.bits = bits as *mut u8;
        self.size = (width, height);
        Ok(())
    }
}

impl SurfaceBackend for LayeredSurface {
    fn set_frame(&mut self, frame: ScreenRect, screen_height: f64) -> anyhow::Result<()> {
        let wm = CoordinateConverter::from_canonical(frame, screen_height);
        let (width, height) = (wm.width.ceil() as i32, wm.height.ceil() as i32);
        self.ensure_bitmap(width, height)?;
        unsafe {
            SetWindowPos(
                self.hwnd,
                HWND_TOPMOST,
                wm.x.round() as i32,
                wm.y.round() as i32,
                width,
                height,
                SWP_NOACTIVATE,
            )?;
        }
        Ok(())
    }

    fn show_without_activation(&mut self) -> anyhow::Result<()> {
        unsafe {
            SetWindowPos(
                self.hwnd,
                HWND_TOPMOST,
                0,
                0,
                0,
                0,
                SWP_NOMOVE | SWP_NOSIZE | SWP_NOACTIVATE | SWP_SHOWWINDOW,
            )?;
        }
        pump_overlay_messages();
        Ok(())
    }

    fn hide(&mut self) -> anyhow::Result<()> {
        unsafe {
            let _ = ShowWindow(self.hwnd, SW_HIDE);
        }
        pump_overlay_messages();
        Ok(())
    }

    fn set_click_through(&mut self, click_through: bool) -> anyhow::Result<()> {
        if self.click_through == click_through {
            return Ok(());
        }
        let style = compose_overlay_window_ex_style(click_through);
        unsafe {
            let _ = SetWindowLongPtrW(self.hwnd, GWL_EXSTYLE, style.0 as isize);
        }
        self.click_through = click_through;
        debug!(click_through, "overlay click-through updated");
        Ok(())
    }

    fn present(&mut self, list: &DrawList) -> anyhow::Result<()> {
        self.ensure_bitmap(list.width as i32, list.height as i32)?;
        if self.bits.is_null() {
            return Ok(());
        }
        let rgba = render_to_rgba(list);
        let len = (self.size.0 as usize) * (self.size.1 as usize) * 4;
        let pixels = unsafe { std::slice::from_raw_parts_mut(self.bits, len) };
        if rgba.len() != pixels.len() {
            warn!(expected = pixels.len(), got = rgba.len(), "draw list size mismatch");
            return Ok(());
        }
        convert_rgba_to_dib_bgra(&rgba, pixels);
        unsafe {
            let _ = InvalidateRect(self.hwnd, None, false);
        }
        pump_overlay_messages();
        Ok(())
    }

    fn drain_clicks(&mut self) -> Vec<Point> {
        pump_overlay_messages();
        let mut clicks = Vec::new();
        loop {
            match self.clicks.try_recv() {
                Ok(point) => clicks.push(point),
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        clicks
    }
}

impl Drop for LayeredSurface {
    fn drop(&mut self) {
        self.release_bitmap();
        unsafe {
            if !self.mem_dc.0.is_null() {
                let _ = DeleteDC(self.mem_dc);
                self.mem_dc = HDC::default();
            }
            if !self.hwnd.0.is_null() {
                if let Ok(mut senders) = CLICK_SENDERS.lock() {
                    senders.remove(&(self.hwnd.0 as isize));
                }
                let _ = DestroyWindow(self.hwnd);
                self.hwnd = HWND::default();
            }
        }
    }
}
