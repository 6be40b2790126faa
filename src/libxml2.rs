//! LibXML2 FFI wrapper for well-formedness checks and DTD validation.
//!
//! No pure Rust crate validates against a DTD, so rendered documents are handed
//! to libxml2 directly:
//!
//! - **Well-formedness**: `xmlReadMemory` with network access disabled. The
//!   DOCTYPE's remote system id is never fetched.
//! - **DTD validation**: DTD files are parsed once with `xmlParseDTD`, wrapped in
//!   an Arc'd RAII pointer and shared; every validation gets its own context.
//!
//! ## Thread Safety
//!
//! - Initialization runs exactly once behind `std::sync::Once`.
//! - DTD parsing is serialized with a process-wide lock.
//! - Validation of distinct documents is parallel. Error collection uses the
//!   structured error handler, which libxml2 keeps per thread; it is installed
//!   and removed around each synchronous call.

use std::ffi::{CStr, CString};
use std::marker::PhantomData;
use std::path::Path;
use std::sync::{Arc, Mutex, Once};

use libc::{c_char, c_int, c_uchar, c_void};

use crate::error::{LibXml2Error, LibXml2Result};

static LIBXML2_INIT: Once = Once::new();

/// Guards `xmlParseDTD`; the parser is not re-entrant across threads.
static DTD_PARSE_LOCK: Mutex<()> = Mutex::new(());

/// Never fetch anything over the network while parsing
const XML_PARSE_NONET: c_int = 1 << 11;

/// `xmlErrorLevel::XML_ERR_WARNING`
const XML_ERR_WARNING: c_int = 1;

// Opaque libxml2 structures
#[repr(C)]
pub struct XmlDoc {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlDtd {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlValidCtxt {
    _private: [u8; 0],
}

#[repr(C)]
pub struct xmlError {
    pub domain: c_int,
    pub code: c_int,
    pub message: *const c_char,
    pub level: c_int,
    pub file: *const c_char,
    pub line: c_int,
    pub str1: *const c_char,
    pub str2: *const c_char,
    pub str3: *const c_char,
    pub int1: c_int,
    pub int2: c_int,
    pub ctxt: *mut c_void,
    pub node: *mut c_void,
}

pub type XmlStructuredErrorFunc =
    Option<unsafe extern "C" fn(user_data: *mut c_void, error: *mut xmlError)>;

#[cfg_attr(target_os = "windows", link(name = "libxml2"))]
#[cfg_attr(not(target_os = "windows"), link(name = "xml2"))]
unsafe extern "C" {
    pub fn xmlInitParser();

    pub fn xmlReadMemory(
        buffer: *const c_char,
        size: c_int,
        url: *const c_char,
        encoding: *const c_char,
        options: c_int,
    ) -> *mut XmlDoc;
    pub fn xmlFreeDoc(doc: *mut XmlDoc);

    pub fn xmlParseDTD(external_id: *const c_uchar, system_id: *const c_uchar) -> *mut XmlDtd;
    pub fn xmlFreeDtd(dtd: *mut XmlDtd);

    pub fn xmlNewValidCtxt() -> *mut XmlValidCtxt;
    pub fn xmlFreeValidCtxt(ctxt: *mut XmlValidCtxt);
    pub fn xmlValidateDtd(ctxt: *mut XmlValidCtxt, doc: *mut XmlDoc, dtd: *mut XmlDtd) -> c_int;

    pub fn xmlSetStructuredErrorFunc(ctx: *mut c_void, handler: XmlStructuredErrorFunc);
}

/// Collects libxml2 error messages into the `Vec<String>` behind `user_data`
unsafe extern "C" fn structured_error_callback(user_data: *mut c_void, error: *mut xmlError) {
    if user_data.is_null() || error.is_null() {
        return;
    }

    let errors = unsafe { &mut *(user_data as *mut Vec<String>) };
    let error = unsafe { &*error };

    if error.level <= XML_ERR_WARNING || error.message.is_null() {
        return;
    }

    let message = unsafe { CStr::from_ptr(error.message) };
    let message = message.to_string_lossy();
    let message = message.trim();

    if error.line > 0 {
        errors.push(format!("line {}: {}", error.line, message));
    } else {
        errors.push(message.to_string());
    }
}

/// Installs the collecting error handler for the current thread until dropped
struct ErrorCollector {
    errors: Box<Vec<String>>,
}

impl ErrorCollector {
    fn install() -> Self {
        let mut errors = Box::new(Vec::new());
        unsafe {
            xmlSetStructuredErrorFunc(
                &mut *errors as *mut Vec<String> as *mut c_void,
                Some(structured_error_callback),
            );
        }
        Self { errors }
    }

    fn take(&mut self) -> Vec<String> {
        std::mem::take(&mut *self.errors)
    }
}

impl Drop for ErrorCollector {
    fn drop(&mut self) {
        unsafe {
            xmlSetStructuredErrorFunc(std::ptr::null_mut(), None);
        }
    }
}

/// Shared, reference-counted handle to a parsed DTD
#[derive(Debug, Clone)]
pub struct XmlDtdPtr {
    inner: Arc<XmlDtdInner>,
}

#[derive(Debug)]
struct XmlDtdInner {
    ptr: *mut XmlDtd,
    _phantom: PhantomData<XmlDtd>,
}

// Safety: a parsed DTD is only read during validation
unsafe impl Send for XmlDtdInner {}
unsafe impl Sync for XmlDtdInner {}

impl XmlDtdPtr {
    /// # Safety
    ///
    /// `ptr` must come from `xmlParseDTD` and must not be freed elsewhere.
    unsafe fn from_raw(ptr: *mut XmlDtd, path: &Path) -> LibXml2Result<Self> {
        if ptr.is_null() {
            return Err(LibXml2Error::DtdParseFailed {
                path: path.to_path_buf(),
            });
        }

        Ok(Self {
            inner: Arc::new(XmlDtdInner {
                ptr,
                _phantom: PhantomData,
            }),
        })
    }

    fn as_ptr(&self) -> *mut XmlDtd {
        self.inner.ptr
    }
}

impl Drop for XmlDtdInner {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            unsafe {
                xmlFreeDtd(self.ptr);
            }
            self.ptr = std::ptr::null_mut();
        }
    }
}

/// Outcome of a libxml2 check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    Valid,
    Invalid { errors: Vec<String> },
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }

    pub fn errors(&self) -> &[String] {
        match self {
            ValidationResult::Valid => &[],
            ValidationResult::Invalid { errors } => errors,
        }
    }
}

/// Owned parsed document, freed on drop
struct ParsedDoc(*mut XmlDoc);

impl Drop for ParsedDoc {
    fn drop(&mut self) {
        unsafe {
            xmlFreeDoc(self.0);
        }
    }
}

pub struct LibXml2Wrapper {
    _phantom: PhantomData<()>,
}

impl LibXml2Wrapper {
    pub fn new() -> Self {
        LIBXML2_INIT.call_once(|| unsafe {
            xmlInitParser();
        });

        LibXml2Wrapper {
            _phantom: PhantomData,
        }
    }

    /// Parse `xml` with the collector installed; `Err` carries the parse errors.
    fn parse_document(
        &self,
        xml: &str,
        collector: &mut ErrorCollector,
    ) -> LibXml2Result<std::result::Result<ParsedDoc, Vec<String>>> {
        let size = c_int::try_from(xml.len())
            .map_err(|_| LibXml2Error::DocumentTooLarge { size: xml.len() })?;

        let doc = unsafe {
            xmlReadMemory(
                xml.as_ptr() as *const c_char,
                size,
                c"document.xml".as_ptr(),
                std::ptr::null(),
                XML_PARSE_NONET,
            )
        };

        if doc.is_null() {
            let mut errors = collector.take();
            if errors.is_empty() {
                errors.push("document could not be parsed".to_string());
            }
            return Ok(Err(errors));
        }

        Ok(Ok(ParsedDoc(doc)))
    }

    /// Check that `xml` parses as well-formed XML.
    pub fn check_well_formed(&self, xml: &str) -> LibXml2Result<ValidationResult> {
        let mut collector = ErrorCollector::install();

        match self.parse_document(xml, &mut collector)? {
            Ok(_doc) => Ok(ValidationResult::Valid),
            Err(errors) => Ok(ValidationResult::Invalid { errors }),
        }
    }

    /// Parse a DTD file from disk.
    pub fn parse_dtd_file(&self, path: &Path) -> LibXml2Result<XmlDtdPtr> {
        if !path.is_file() {
            return Err(LibXml2Error::DtdNotFound {
                path: path.to_path_buf(),
            });
        }

        let c_path = path
            .to_str()
            .and_then(|p| CString::new(p).ok())
            .ok_or_else(|| LibXml2Error::InvalidPath {
                path: path.to_path_buf(),
            })?;

        let _guard = DTD_PARSE_LOCK
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let _collector = ErrorCollector::install();

        unsafe {
            let dtd = xmlParseDTD(std::ptr::null(), c_path.as_ptr() as *const c_uchar);
            XmlDtdPtr::from_raw(dtd, path)
        }
    }

    /// Validate `xml` against an already parsed DTD.
    ///
    /// A document that is not well-formed is reported as invalid with its
    /// parse errors.
    pub fn validate_against_dtd(&self, dtd: &XmlDtdPtr, xml: &str) -> LibXml2Result<ValidationResult> {
        let mut collector = ErrorCollector::install();

        let doc = match self.parse_document(xml, &mut collector)? {
            Ok(doc) => doc,
            Err(errors) => return Ok(ValidationResult::Invalid { errors }),
        };

        let valid = unsafe {
            let ctxt = xmlNewValidCtxt();
            if ctxt.is_null() {
                return Err(LibXml2Error::ValidationContextCreationFailed);
            }

            let code = xmlValidateDtd(ctxt, doc.0, dtd.as_ptr());
            xmlFreeValidCtxt(ctxt);
            code == 1
        };

        if valid {
            Ok(ValidationResult::Valid)
        } else {
            let mut errors = collector.take();
            if errors.is_empty() {
                errors.push("document does not match the DTD".to_string());
            }
            Ok(ValidationResult::Invalid { errors })
        }
    }
}

impl Default for LibXml2Wrapper {
    fn default() -> Self {
        Self::new()
    }
}
