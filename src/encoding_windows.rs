//! OEM string handling on Windows.
//!
//! NTLM peers that do not negotiate Unicode exchange strings in the OEM code page of the system.
//! Windows knows which code page that is and converts between it and UTF-16 for us.


use windows::Win32::Globalization::{
    CP_OEMCP, MB_ERR_INVALID_CHARS, MB_PRECOMPOSED, MultiByteToWideChar, WC_COMPOSITECHECK,
    WideCharToMultiByte,
};


/// Converts a Windows length result into a non-zero buffer size.
fn nonzero_len(count: i32) -> Option<usize> {
    match usize::try_from(count) {
        Ok(0) | Err(_) => None,
        Ok(n) => Some(n),
    }
}


/// Decodes an OEM string from a challenge message payload.
pub fn decode_oem(oem_bytes: &[u8]) -> Option<String> {
    if oem_bytes.is_empty() {
        return Some(String::new());
    }

    let flags = MB_ERR_INVALID_CHARS | MB_PRECOMPOSED;

    // measure, then convert
    let needed = nonzero_len(unsafe { MultiByteToWideChar(CP_OEMCP, flags, oem_bytes, None) })?;
    let mut wide = vec![0u16; needed];
    let written = nonzero_len(unsafe {
        MultiByteToWideChar(CP_OEMCP, flags, oem_bytes, Some(wide.as_mut_slice()))
    })?;
    wide.truncate(written);

    String::from_utf16(&wide).ok()
}


/// Encodes a string for an OEM payload field.
pub fn encode_oem(string: &str) -> Option<Vec<u8>> {
    if string.is_empty() {
        return Some(Vec::new());
    }

    let wide: Vec<u16> = string.encode_utf16().collect();

    // measure, then convert
    let needed = nonzero_len(unsafe {
        WideCharToMultiByte(CP_OEMCP, WC_COMPOSITECHECK, &wide, None, None, None)
    })?;
    let mut oem = vec![0u8; needed];
    let written = nonzero_len(unsafe {
        WideCharToMultiByte(CP_OEMCP, WC_COMPOSITECHECK, &wide, Some(oem.as_mut_slice()), None, None)
    })?;
    oem.truncate(written);

    Some(oem)
}
