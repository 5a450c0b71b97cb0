//! Fixed HTML pages shown to someone following an approval link.
//!
//! Pages carry no request data. An expired link and a link that never
//! existed render the same page.

use budgetgate_core::Resolution;

macro_rules! page {
    ($title:literal, $body:literal) => {
        concat!(
            "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>",
            $title,
            "</title><style>",
            "body{font-family:sans-serif;max-width:32rem;margin:4rem auto;color:#222}h1{font-size:1.4rem}",
            "</style></head><body><h1>",
            $title,
            "</h1><p>",
            $body,
            "</p></body></html>"
        )
    };
}

pub const APPROVED: &str = page!(
    "Request approved",
    "The budget request has been approved and sent for processing. The requester has been notified."
);

pub const DENIED: &str = page!(
    "Request denied",
    "The budget request has been denied. The requester has been notified."
);

pub const LINK_EXPIRED: &str = page!(
    "Link expired or invalid",
    "This link has expired, has already been used, or is not valid. No action was taken."
);

pub const ERROR: &str = page!(
    "Something went wrong",
    "Your decision could not be processed. The operations team has been alerted."
);

/// Page for a resolution.
#[must_use]
pub fn page_for(resolution: Resolution) -> &'static str {
    match resolution {
        Resolution::Approved => APPROVED,
        Resolution::Denied => DENIED,
        Resolution::Expired | Resolution::Invalid => LINK_EXPIRED,
        Resolution::Error => ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dead_links_share_a_page() {
        assert_eq!(page_for(Resolution::Expired), page_for(Resolution::Invalid));
        assert_eq!(page_for(Resolution::Expired), LINK_EXPIRED);
    }

    #[test]
    fn test_pages_are_distinct() {
        let pages = [APPROVED, DENIED, LINK_EXPIRED, ERROR];
        for (i, a) in pages.iter().enumerate() {
            for b in &pages[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_pages_are_complete_documents() {
        for page in [APPROVED, DENIED, LINK_EXPIRED, ERROR] {
            assert!(page.starts_with("<!DOCTYPE html>"));
            assert!(page.ends_with("</html>"));
            assert!(page.contains("<style>"));
        }
    }
}
