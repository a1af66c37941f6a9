//! Route templates for span fields and metric labels.

use uuid::Uuid;

/// Replace UUID path segments so every enrollment shares one label.
pub(super) fn route_template(path: &str) -> String {
    if path == "/" {
        return "/".to_owned();
    }

    let mut template = String::from("/");

    for (index, segment) in path.trim_start_matches('/').split('/').enumerate() {
        if index > 0 {
            template.push('/');
        }

        if Uuid::parse_str(segment).is_ok() {
            template.push_str("{uuid}");
        } else {
            template.push_str(segment);
        }
    }

    template
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuid_segments_are_replaced() {
        let uuid = Uuid::now_v7();

        assert_eq!(
            route_template(&format!("/courses/{uuid}/enroll")),
            "/courses/{uuid}/enroll"
        );
        assert_eq!(route_template("/payments/fawry/callback"), "/payments/fawry/callback");
        assert_eq!(route_template("/"), "/");
    }
}
