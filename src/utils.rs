/// Check if the current process runs elevated.
///
/// Always `false` off Windows.
#[must_use]
pub fn is_admin() -> bool {
    #[cfg(windows)]
    {
        use windows::Win32::Foundation::{CloseHandle, HANDLE};
        use windows::Win32::Security::{
            GetTokenInformation, TokenElevation, TOKEN_ELEVATION, TOKEN_QUERY,
        };
        use windows::Win32::System::Threading::{GetCurrentProcess, OpenProcessToken};

        struct TokenHandle(HANDLE);

        impl Drop for TokenHandle {
            fn drop(&mut self) {
                unsafe {
                    let _ = CloseHandle(self.0);
                }
            }
        }

        unsafe {
            let mut handle = HANDLE::default();
            if OpenProcessToken(GetCurrentProcess(), TOKEN_QUERY, &raw mut handle).is_err() {
                return false;
            }
            let token = TokenHandle(handle);

            let mut elevation = TOKEN_ELEVATION::default();
            let mut returned = 0u32;

            #[allow(clippy::cast_possible_truncation)]
            let queried = GetTokenInformation(
                token.0,
                TokenElevation,
                Some((&raw mut elevation).cast()),
                std::mem::size_of::<TOKEN_ELEVATION>() as u32,
                &raw mut returned,
            );

            queried.is_ok() && elevation.TokenIsElevated != 0
        }
    }

    #[cfg(not(windows))]
    {
        false
    }
}
