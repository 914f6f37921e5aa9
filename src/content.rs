//! Content encoding: structured form fields to the string a QR code carries.
//!
//! Encoding never fails. Missing fields become empty segments so drafts can
//! be previewed at any point; required-field checks live in
//! [`crate::validate`].

use serde::{Deserialize, Serialize};

/// Kind of content a QR code carries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QrType {
    #[default]
    Url,
    Text,
    Vcard,
    Wifi,
    Email,
    Phone,
    Sms,
    Location,
    Instagram,
    Facebook,
    Whatsapp,
    Youtube,
    Image,
}

impl QrType {
    pub const ALL: [QrType; 13] = [
        QrType::Url,
        QrType::Text,
        QrType::Vcard,
        QrType::Wifi,
        QrType::Email,
        QrType::Phone,
        QrType::Sms,
        QrType::Location,
        QrType::Instagram,
        QrType::Facebook,
        QrType::Whatsapp,
        QrType::Youtube,
        QrType::Image,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            QrType::Url => "url",
            QrType::Text => "text",
            QrType::Vcard => "vcard",
            QrType::Wifi => "wifi",
            QrType::Email => "email",
            QrType::Phone => "phone",
            QrType::Sms => "sms",
            QrType::Location => "location",
            QrType::Instagram => "instagram",
            QrType::Facebook => "facebook",
            QrType::Whatsapp => "whatsapp",
            QrType::Youtube => "youtube",
            QrType::Image => "image",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }

    /// Types whose scans go through the tracking redirect.
    pub fn is_tracked(self) -> bool {
        matches!(
            self,
            QrType::Url | QrType::Instagram | QrType::Facebook | QrType::Youtube | QrType::Whatsapp
        )
    }
}

impl std::fmt::Display for QrType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Form fields across all content types. Each type reads its own subset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContentFields {
    // url / youtube
    pub url: Option<String>,
    // text
    pub text: Option<String>,

    // vcard
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub organization: Option<String>,
    pub title: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub address: Option<String>,

    // wifi
    pub ssid: Option<String>,
    pub password: Option<String>,
    pub encryption: Option<String>,
    pub hidden: Option<bool>,

    // email / sms / whatsapp
    pub subject: Option<String>,
    pub body: Option<String>,
    pub message: Option<String>,

    // location
    pub latitude: Option<String>,
    pub longitude: Option<String>,

    // social
    pub username: Option<String>,

    // image
    pub image_url: Option<String>,
}

fn field(value: &Option<String>) -> &str {
    value.as_deref().map(str::trim).unwrap_or("")
}

/// Build the content string for `qr_type` from `fields`.
pub fn encode(qr_type: QrType, fields: &ContentFields) -> String {
    match qr_type {
        QrType::Url | QrType::Youtube => field(&fields.url).to_string(),
        QrType::Text => fields.text.clone().unwrap_or_default(),
        QrType::Vcard => encode_vcard(fields),
        QrType::Wifi => encode_wifi(fields),
        QrType::Email => format!(
            "mailto:{}?subject={}&body={}",
            field(&fields.email),
            percent(field(&fields.subject)),
            percent(field(&fields.body)),
        ),
        QrType::Phone => format!("tel:{}", field(&fields.phone)),
        QrType::Sms => {
            let mut uri = format!("sms:{}", field(&fields.phone));
            let message = field(&fields.message);
            if !message.is_empty() {
                uri.push_str("?body=");
                uri.push_str(&percent(message));
            }
            uri
        }
        QrType::Location => {
            let lat = non_empty_or(field(&fields.latitude), "0");
            let lng = non_empty_or(field(&fields.longitude), "0");
            format!("geo:{lat},{lng}")
        }
        QrType::Instagram => format!("https://instagram.com/{}", username(fields)),
        QrType::Facebook => format!("https://facebook.com/{}", username(fields)),
        QrType::Whatsapp => {
            let number: String = field(&fields.phone)
                .chars()
                .filter(char::is_ascii_digit)
                .collect();
            let mut uri = format!("https://wa.me/{number}");
            let message = field(&fields.message);
            if !message.is_empty() {
                uri.push_str("?text=");
                uri.push_str(&percent(message));
            }
            uri
        }
        QrType::Image => field(&fields.image_url).to_string(),
    }
}

/// Percent-encode a URI query component. Like a browser's
/// `encodeURIComponent`, `!'()*` stay as they are.
pub(crate) fn percent(value: &str) -> String {
    let mut out = urlencoding::encode(value).into_owned();
    for (escaped, mark) in [("%21", "!"), ("%27", "'"), ("%28", "("), ("%29", ")"), ("%2A", "*")] {
        out = out.replace(escaped, mark);
    }
    out
}

fn non_empty_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.is_empty() { fallback } else { value }
}

fn username(fields: &ContentFields) -> &str {
    field(&fields.username).trim_start_matches('@')
}

/// vCard 3.0. Line order is fixed; contact importers rely on it.
fn encode_vcard(fields: &ContentFields) -> String {
    let first = field(&fields.first_name);
    let last = field(&fields.last_name);
    let full_name = format!("{first} {last}");

    [
        "BEGIN:VCARD".to_string(),
        "VERSION:3.0".to_string(),
        format!("N:{last};{first};;;"),
        format!("FN:{}", full_name.trim()),
        format!("ORG:{}", field(&fields.organization)),
        format!("TITLE:{}", field(&fields.title)),
        format!("TEL:{}", field(&fields.phone)),
        format!("EMAIL:{}", field(&fields.email)),
        format!("URL:{}", field(&fields.website)),
        format!("ADR:;;{};;;;", field(&fields.address)),
        "END:VCARD".to_string(),
    ]
    .join("\n")
}

fn encode_wifi(fields: &ContentFields) -> String {
    let encryption = non_empty_or(field(&fields.encryption), "WPA");
    let ssid = escape_wifi_field(fields.ssid.as_deref().unwrap_or(""));
    let password = escape_wifi_field(fields.password.as_deref().unwrap_or(""));

    let mut out = format!("WIFI:T:{encryption};S:{ssid};P:{password};");
    if fields.hidden == Some(true) {
        out.push_str("H:true;");
    }
    out.push(';');
    out
}

/// Escape characters reserved by the WIFI: payload format.
fn escape_wifi_field(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    for c in s.chars() {
        match c {
            '\\' | ';' | ',' | '"' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

/// Whether `src` can be used as an image reference by a renderer.
pub fn is_renderable_image_ref(src: &str) -> bool {
    let src = src.trim();
    let lower = src.get(..8).unwrap_or(src).to_ascii_lowercase();
    lower.starts_with("http://")
        || lower.starts_with("https://")
        || lower.starts_with("data:")
        || lower.starts_with("blob:")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wifi_exact() {
        let fields = ContentFields {
            ssid: Some("Home".to_string()),
            password: Some("secret1".to_string()),
            encryption: Some("WPA".to_string()),
            ..Default::default()
        };
        assert_eq!(encode(QrType::Wifi, &fields), "WIFI:T:WPA;S:Home;P:secret1;;");
    }

    #[test]
    fn test_wifi_defaults_and_escaping() {
        assert_eq!(
            encode(QrType::Wifi, &ContentFields::default()),
            "WIFI:T:WPA;S:;P:;;"
        );

        let fields = ContentFields {
            ssid: Some("Cafe;Guest".to_string()),
            password: Some("a,b\"c".to_string()),
            encryption: Some("WEP".to_string()),
            hidden: Some(true),
            ..Default::default()
        };
        assert_eq!(
            encode(QrType::Wifi, &fields),
            r#"WIFI:T:WEP;S:Cafe\;Guest;P:a\,b\"c;H:true;;"#
        );
    }

    #[test]
    fn test_phone_exact() {
        let fields = ContentFields {
            phone: Some("+1234567890".to_string()),
            ..Default::default()
        };
        assert_eq!(encode(QrType::Phone, &fields), "tel:+1234567890");
    }

    #[test]
    fn test_vcard_scenario() {
        let fields = ContentFields {
            first_name: Some("Jane".to_string()),
            last_name: Some("Doe".to_string()),
            email: Some("jane@x.com".to_string()),
            ..Default::default()
        };
        let card = encode(QrType::Vcard, &fields);
        let lines: Vec<&str> = card.lines().collect();

        assert!(lines.contains(&"FN:Jane Doe"));
        assert!(lines.contains(&"EMAIL:jane@x.com"));
        assert!(lines.contains(&"ORG:"));
        assert!(lines.contains(&"TITLE:"));
        assert!(lines.contains(&"TEL:"));

        insta::assert_snapshot!(card, @r"
        BEGIN:VCARD
        VERSION:3.0
        N:Doe;Jane;;;
        FN:Jane Doe
        ORG:
        TITLE:
        TEL:
        EMAIL:jane@x.com
        URL:
        ADR:;;;;;;
        END:VCARD
        ");
    }

    #[test]
    fn test_email_percent_encodes_query() {
        let fields = ContentFields {
            email: Some("hi@example.com".to_string()),
            subject: Some("Hello there".to_string()),
            body: Some("a&b".to_string()),
            ..Default::default()
        };
        assert_eq!(
            encode(QrType::Email, &fields),
            "mailto:hi@example.com?subject=Hello%20there&body=a%26b"
        );
    }

    #[test]
    fn test_percent_keeps_uri_marks() {
        assert_eq!(percent("Hi! (it's *new*)"), "Hi!%20(it's%20*new*)");
        assert_eq!(percent("100%21"), "100%2521");
        assert_eq!(percent("a/b?c=d"), "a%2Fb%3Fc%3Dd");
    }

    #[test]
    fn test_sms_body_only_with_message() {
        let mut fields = ContentFields {
            phone: Some("555".to_string()),
            ..Default::default()
        };
        assert_eq!(encode(QrType::Sms, &fields), "sms:555");
        fields.message = Some("on my way".to_string());
        assert_eq!(encode(QrType::Sms, &fields), "sms:555?body=on%20my%20way");
    }

    #[test]
    fn test_location_defaults_to_zero() {
        let fields = ContentFields {
            latitude: Some("52.52".to_string()),
            ..Default::default()
        };
        assert_eq!(encode(QrType::Location, &fields), "geo:52.52,0");
        assert_eq!(encode(QrType::Location, &ContentFields::default()), "geo:0,0");
    }

    #[test]
    fn test_social_and_whatsapp() {
        let fields = ContentFields {
            username: Some("@rustlang".to_string()),
            phone: Some("+1 (555) 010-2030".to_string()),
            message: Some("Hi!".to_string()),
            ..Default::default()
        };
        assert_eq!(
            encode(QrType::Instagram, &fields),
            "https://instagram.com/rustlang"
        );
        assert_eq!(
            encode(QrType::Facebook, &fields),
            "https://facebook.com/rustlang"
        );
        assert_eq!(
            encode(QrType::Whatsapp, &fields),
            "https://wa.me/15550102030?text=Hi!"
        );
    }

    #[test]
    fn test_pass_through_types() {
        let fields = ContentFields {
            url: Some("https://youtu.be/abc".to_string()),
            text: Some("  keep spacing ".to_string()),
            image_url: Some("https://cdn.example.com/a.png".to_string()),
            ..Default::default()
        };
        assert_eq!(encode(QrType::Youtube, &fields), "https://youtu.be/abc");
        assert_eq!(encode(QrType::Url, &fields), "https://youtu.be/abc");
        assert_eq!(encode(QrType::Text, &fields), "  keep spacing ");
        assert_eq!(encode(QrType::Image, &fields), "https://cdn.example.com/a.png");
    }

    #[test]
    fn test_image_reference_check() {
        assert!(is_renderable_image_ref("https://cdn.example.com/a.png"));
        assert!(is_renderable_image_ref("HTTP://cdn.example.com/a.png"));
        assert!(is_renderable_image_ref("data:image/png;base64,AAAA"));
        assert!(is_renderable_image_ref("blob:https://app/1234"));
        assert!(!is_renderable_image_ref("/uploads/a.png"));
        assert!(!is_renderable_image_ref("ftp://host/a.png"));
        assert!(!is_renderable_image_ref(""));
    }

    #[test]
    fn test_qr_type_parse() {
        for t in QrType::ALL {
            assert_eq!(QrType::parse(t.as_str()), Some(t));
        }
        assert_eq!(QrType::parse("WiFi"), Some(QrType::Wifi));
        assert_eq!(QrType::parse("fax"), None);
        assert!(QrType::Url.is_tracked());
        assert!(!QrType::Text.is_tracked());
    }
}
