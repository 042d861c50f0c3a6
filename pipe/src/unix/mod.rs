pub(crate) mod io;
pub(crate) mod pipe;

pub(crate) fn errno() -> libc::c_int {
    std::io::Error::last_os_error().raw_os_error().unwrap_or(0)
}
