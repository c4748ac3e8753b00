//! xTool Response Parser
//!
//! Classifies a single line received from the engraver into a tagged
//! [`XToolResponse`]. The tokenizer is pure; the command channel decides what
//! each kind means for flow control.


/// Classified device line
#[derive(Debug, Clone, PartialEq)]
pub enum XToolResponse {
    /// Single acknowledgment (`ok`)
    Ok,
    /// Several acknowledgments glued together (`okok...`), a firmware quirk
    Acks(usize),
    /// Machine position report (`<MPos:x,y,z,a>`)
    Position([f64; 4]),
    /// Line that starts like a position report but does not parse
    MalformedPosition(String),
    /// Setting report (`$N=value`)
    Parameter {
        /// Setting number
        number: u32,
        /// Raw value text
        value: String,
    },
    /// Explicit error from the firmware (line starting with `err`)
    Error(String),
    /// Empty line
    Blank,
    /// Anything else (banners, version info)
    Unrecognized(String),
}

/// Parse one device line
pub fn parse_response(line: &str) -> XToolResponse {
    let line = line.trim();

    if line.is_empty() {
        return XToolResponse::Blank;
    }

    if line == "ok" {
        return XToolResponse::Ok;
    }

    if line.starts_with("<MPos") {
        return match parse_position(line) {
            Some(axes) => XToolResponse::Position(axes),
            None => XToolResponse::MalformedPosition(line.to_string()),
        };
    }

    if let Some(setting) = line.strip_prefix('$') {
        return match parse_parameter(setting) {
            Some((number, value)) => XToolResponse::Parameter { number, value },
            None => XToolResponse::Unrecognized(line.to_string()),
        };
    }

    if line.starts_with("err") {
        return XToolResponse::Error(line.to_string());
    }

    if let Some(count) = count_glued_acks(line) {
        return XToolResponse::Acks(count);
    }

    XToolResponse::Unrecognized(line.to_string())
}

/// `<MPos:a,b,c,d>` with exactly four fixed-point fields
fn parse_position(line: &str) -> Option<[f64; 4]> {
    let body = line.strip_prefix("<MPos:")?;
    let end = body.find('>')?;

    let mut axes = [0.0; 4];
    let mut fields = body[..end].split(',');
    for axis in axes.iter_mut() {
        *axis = parse_fixed_point(fields.next()?)?;
    }
    if fields.next().is_some() {
        return None;
    }
    Some(axes)
}

/// `-?digits.digits`
fn parse_fixed_point(field: &str) -> Option<f64> {
    let unsigned = field.strip_prefix('-').unwrap_or(field);
    let (whole, fraction) = unsigned.split_once('.')?;
    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(whole) || !all_digits(fraction) {
        return None;
    }
    field.parse().ok()
}

/// `N=value` with `N` a positive number without leading zeros
fn parse_parameter(setting: &str) -> Option<(u32, String)> {
    let (number, value) = setting.split_once('=')?;
    if number.starts_with('0') || number.is_empty() || !number.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }
    Some((number.parse().ok()?, value.to_string()))
}

fn count_glued_acks(line: &str) -> Option<usize> {
    let bytes = line.as_bytes();
    if bytes.len() % 2 != 0 || !bytes.chunks(2).all(|pair| pair == b"ok") {
        return None;
    }
    Some(bytes.len() / 2)
}
