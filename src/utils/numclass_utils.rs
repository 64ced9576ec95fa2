#![forbid(unsafe_code)]

use path_absolutize::Absolutize;
use std::ops::Deref;
use std::path::Path;

use poem::Request;

use log::{debug, LevelFilter};

// ***************************************************************************
// GENERAL PUBLIC FUNCTIONS
// ***************************************************************************
// ---------------------------------------------------------------------------
// get_absolute_path:
// ---------------------------------------------------------------------------
/** Replace tilde (~) and environment variable values in a path name and
 * then construct the absolute path name.  Absolutize, unlike canonicalize,
 * does not care whether the file exists.
 *
 * On any expansion or conversion failure the original path is returned.
 */
pub fn get_absolute_path(path: &str) -> String {
    let s = match shellexpand::full(path) {
        Ok(x) => x,
        Err(_) => return path.to_owned(),
    };

    // Convert to absolute path if necessary.
    let p = Path::new(s.deref());
    let p1 = match p.absolutize() {
        Ok(x) => x,
        Err(_) => return path.to_owned(),
    };
    let p2 = match p1.to_str() {
        Some(x) => x,
        None => return path.to_owned(),
    };

    p2.to_owned()
}

// ***************************************************************************
//                                  Traits
// ***************************************************************************
pub trait RequestDebug {
    type Req;
    fn get_request_info(&self) -> String;
}

// ---------------------------------------------------------------------------
// debug_request:
// ---------------------------------------------------------------------------
// Dump http request information to the log.
pub fn debug_request(http_req: &Request, req: &impl RequestDebug) {
    // Check that debug or higher logging is in effect.
    if log::max_level() < LevelFilter::Debug {
        return;
    }

    debug!("{}", format_request(http_req, req));
}

// ***************************************************************************
// PRIVATE FUNCTIONS
// ***************************************************************************
// ---------------------------------------------------------------------------
// format_request:
// ---------------------------------------------------------------------------
fn format_request(http_req: &Request, req: &impl RequestDebug) -> String {
    // Accumulate the output.
    let mut s = "\n".to_string();

    // Restate the URI.
    let uri = http_req.uri();
    s += format!("  URI: {:?}\n", uri).as_str();

    // Accumulate the headers
    for v in http_req.headers().iter() {
         s += format!("  Header: {} = {:?} \n", v.0, v.1).as_str();
    };

    // List query parameters.
    if let Some(q) = uri.query() {
        s += format!("  Query Parameters: {:?}\n", q).as_str();
    } else {
        s += "  * No Query Parameters\n";
    }

    // Add the request's information.
    s += req.get_request_info().as_str();
    s
}

// ***************************************************************************
//                                  Tests
// ***************************************************************************
#[cfg(test)]
mod tests {
    use super::*;
    use poem::http::Uri;

    struct Probe;

    impl RequestDebug for Probe {
        type Req = Probe;
        fn get_request_info(&self) -> String {
            "  Request body: probe".to_string()
        }
    }

    #[test]
    fn absolute_path_is_absolute() {
        let p = get_absolute_path("relative/dir");
        assert!(Path::new(&p).is_absolute());
        assert!(p.ends_with("relative/dir"));
    }

    #[test]
    fn absolute_path_keeps_absolute_input() {
        assert_eq!(get_absolute_path("/etc/numclass"), "/etc/numclass");
    }

    #[test]
    fn formats_request_with_query() {
        let req = Request::builder()
            .uri(Uri::from_static("/api/classify-number?number=371"))
            .header("Origin", "http://example.com")
            .finish();
        let s = format_request(&req, &Probe);
        assert!(s.contains("number=371"));
        assert!(s.contains("origin"));
        assert!(s.contains("Request body: probe"));
    }

    #[test]
    fn formats_request_without_query() {
        let req = Request::builder()
            .uri(Uri::from_static("/api/classify-number"))
            .finish();
        let s = format_request(&req, &Probe);
        assert!(s.contains("* No Query Parameters"));
    }
}
