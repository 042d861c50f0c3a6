pub(crate) mod handle;

pub(crate) fn last_error() -> u64 {
    unsafe { winapi::um::errhandlingapi::GetLastError() }.into()
}
