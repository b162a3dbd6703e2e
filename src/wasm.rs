//! WebAssembly support glue. A bare `abort` is all a WASM panic gives you by
//! default; the hook forwards the panic message to the browser console.

#[cfg(all(target_arch = "wasm32", feature = "web"))]
pub fn set_panic_hook() {
    console_error_panic_hook::set_once();
}
