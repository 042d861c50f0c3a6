pub(crate) mod io;
pub(crate) mod pipe;

pub(crate) fn last_error() -> u32 {
    unsafe { winapi::um::errhandlingapi::GetLastError() }
}
