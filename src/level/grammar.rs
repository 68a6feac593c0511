//! Level grammar
//!
//! A level is a JSON array of rows. Each entry is one of:
//! - `0`, `"0"`, `""` or `null`: empty
//! - a bare non-negative integer or numeric string (legacy, read as `T:<n>`)
//! - a composite descriptor: `/`-separated `KEY:VALUE` properties
//! - a modifier descriptor: `M:<type>[key=value|...]`, optionally followed
//!   by further `/`-separated properties
//!
//! Parsing is all-or-nothing: the first bad cell aborts the level.

use std::path::Path;

use serde_json::Value;

use super::cell::{
    Animation, Appearance, Cell, CellKind, Collision, Color, ColorBlock, Flip, Lock,
    ModifierKind, ModifierParams, ParamValue, SyncType, Transform,
};
use super::error::{CellError, LevelError};
use super::matrix::Matrix;

/// Number of appearance fields after the colour block
const APPEARANCE_TRAILING_FIELDS: usize = 10;
/// Length of an explicit cell id
const CELL_ID_LEN: usize = 5;

/// Parse a level from JSON text
pub fn parse_level_json(json: &str) -> Result<Matrix, LevelError> {
    let rows: Vec<Vec<Value>> = serde_json::from_str(json)?;
    parse_level(&rows)
}

/// Read and parse a level file
pub fn load_level(path: impl AsRef<Path>) -> Result<Matrix, LevelError> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path)?;
    let matrix = parse_level_json(&json)?;
    log::info!(
        "Loaded level {} ({}x{})",
        path.display(),
        matrix.width(),
        matrix.height()
    );
    Ok(matrix)
}

/// Parse rows of raw cell values into a matrix
pub fn parse_level(rows: &[Vec<Value>]) -> Result<Matrix, LevelError> {
    let width = rows.first().map(Vec::len).unwrap_or(0);
    let mut parsed = Vec::with_capacity(rows.len());
    for (row, values) in rows.iter().enumerate() {
        if values.len() != width {
            return Err(LevelError::RaggedRow {
                row,
                expected: width,
                found: values.len(),
            });
        }
        let mut cells = Vec::with_capacity(width);
        for (col, value) in values.iter().enumerate() {
            let cell = parse_value(value).map_err(|source| LevelError::Cell { row, col, source })?;
            cells.push(cell);
        }
        parsed.push(cells);
    }
    Matrix::from_rows(parsed)
}

/// Parse one raw JSON cell value
pub fn parse_value(value: &Value) -> Result<Option<Cell>, CellError> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => match n.as_u64() {
            Some(0) => Ok(None),
            Some(code) => {
                let code = u32::try_from(code).map_err(|_| CellError::InvalidType(n.to_string()))?;
                parse_cell(&format!("T:{}", code))
            }
            None => Err(CellError::InvalidType(n.to_string())),
        },
        Value::String(s) => parse_cell(s),
        other => Err(CellError::UnsupportedValue(other.to_string())),
    }
}

/// Parse one cell descriptor string
pub fn parse_cell(descriptor: &str) -> Result<Option<Cell>, CellError> {
    if descriptor.is_empty() {
        return Ok(None);
    }
    if is_uint(descriptor) {
        // Legacy bare type code
        let code = parse_uint(descriptor).ok_or_else(|| CellError::InvalidType(descriptor.into()))?;
        if code == 0 {
            return Ok(None);
        }
        return parse_descriptor(&format!("T:{}", code)).map(Some);
    }
    parse_descriptor(descriptor).map(Some)
}

/// Properties seen while scanning a descriptor
#[derive(Default)]
struct Props {
    type_code: Option<u32>,
    modifier: Option<(ModifierKind, ModifierParams)>,
    id: Option<String>,
    transform: Option<Transform>,
    appearance: Option<Appearance>,
    layer: Option<u32>,
    collision: Option<Collision>,
    group: Option<u32>,
    lock: Option<Lock>,
    animation: Option<Animation>,
}

/// Store a property value, rejecting repeats
fn set_once<T>(slot: &mut Option<T>, key: &str, value: T) -> Result<(), CellError> {
    if slot.is_some() {
        return Err(CellError::DuplicateProperty(key.to_string()));
    }
    *slot = Some(value);
    Ok(())
}

fn parse_descriptor(descriptor: &str) -> Result<Cell, CellError> {
    let mut props = Props::default();

    for segment in split_top_level(descriptor, '/')? {
        if let Some(rest) = segment.strip_prefix("M:") {
            let modifier = parse_modifier(rest)?;
            set_once(&mut props.modifier, "M", modifier)?;
            continue;
        }

        let (key, value) = segment
            .split_once(':')
            .filter(|(k, _)| !k.is_empty())
            .ok_or_else(|| CellError::MalformedProperty(segment.to_string()))?;

        match key {
            "T" => {
                let code = parse_uint(value).ok_or_else(|| CellError::InvalidType(value.into()))?;
                set_once(&mut props.type_code, key, code)?;
            }
            "I" => set_once(&mut props.id, key, parse_id(value)?)?,
            "TR" => set_once(&mut props.transform, key, parse_transform(value)?)?,
            "AP" => set_once(&mut props.appearance, key, parse_appearance(value)?)?,
            "L" => {
                let layer = parse_uint(value).ok_or_else(|| CellError::InvalidLayer(value.into()))?;
                set_once(&mut props.layer, key, layer)?;
            }
            "CT" => {
                let collision = Collision::from_str(value)
                    .ok_or_else(|| CellError::InvalidCollision(value.into()))?;
                set_once(&mut props.collision, key, collision)?;
            }
            "G" => {
                let group = parse_uint(value).ok_or_else(|| CellError::InvalidGroup(value.into()))?;
                set_once(&mut props.group, key, group)?;
            }
            "LK" => set_once(&mut props.lock, key, parse_lock(value)?)?,
            "AN" => set_once(&mut props.animation, key, parse_animation(value)?)?,
            _ => return Err(CellError::UnknownProperty(key.to_string())),
        }
    }

    build_cell(props)
}

fn build_cell(props: Props) -> Result<Cell, CellError> {
    let (kind, params) = match (props.type_code, props.modifier) {
        (None, None) => return Err(CellError::MissingType),
        (Some(0), _) => return Err(CellError::ZeroType),
        (Some(declared), Some((modifier, _))) if declared != modifier.code() => {
            return Err(CellError::ModifierTypeMismatch {
                modifier: modifier.code(),
                declared,
            });
        }
        (_, Some((modifier, params))) => (CellKind::Modifier(modifier), params),
        (Some(code), None) => {
            let kind = CellKind::from_code(code).ok_or(CellError::ZeroType)?;
            (kind, ModifierParams::new())
        }
    };

    let group = props.group.unwrap_or(0);
    let lock = props.lock.unwrap_or_default();
    if lock != Lock::None && group == 0 {
        return Err(CellError::LockWithoutGroup(lock.as_str().to_string()));
    }

    Ok(Cell {
        kind,
        id: props.id,
        transform: props.transform.unwrap_or_default(),
        appearance: props.appearance.unwrap_or_default(),
        layer: props.layer.unwrap_or(0),
        collision: props.collision.unwrap_or_else(|| kind.default_collision()),
        group,
        lock,
        animation: props.animation.unwrap_or_default(),
        params,
    })
}

fn parse_id(value: &str) -> Result<String, CellError> {
    if value.len() == CELL_ID_LEN && value.chars().all(|c| c.is_ascii_alphanumeric()) {
        Ok(value.to_string())
    } else {
        Err(CellError::InvalidId(value.into()))
    }
}

fn parse_lock(value: &str) -> Result<Lock, CellError> {
    match value {
        "off" => Ok(Lock::LockedOff),
        "0" => Ok(Lock::None),
        "unlock" => Ok(Lock::Unlock),
        _ => Err(CellError::InvalidLock(value.into())),
    }
}

/// `[rotation|scale|flip]`
fn parse_transform(value: &str) -> Result<Transform, CellError> {
    let err = |msg: String| CellError::InvalidTransform(msg);
    let parts = bracket_list(value).ok_or_else(|| err(format!("`{}` is not a [..] list", value)))?;
    let &[rotation, scale, flip] = parts.as_slice() else {
        return Err(err(format!("expected 3 fields, found {}", parts.len())));
    };

    let rotation = if rotation == "0" {
        0
    } else {
        rotation
            .strip_prefix('@')
            .and_then(|r| {
                let digits = r.strip_prefix('-').unwrap_or(r);
                is_uint(digits).then(|| r.parse::<i32>().ok()).flatten()
            })
            .ok_or_else(|| err(format!("rotation `{}` must look like @90 or @-45", rotation)))?
    };
    let scale = parse_decimal(scale)
        .ok_or_else(|| err(format!("scale `{}` must be a non-negative decimal", scale)))?;
    let flip = match flip {
        "0" => Flip::None,
        "h" => Flip::Horizontal,
        "v" => Flip::Vertical,
        "hv" => Flip::Both,
        other => return Err(err(format!("flip `{}` must be h, v, hv or 0", other))),
    };

    Ok(Transform {
        rotation,
        scale,
        flip,
    })
}

/// `[C:[base|tint|tintIntensity|shiftRate|pulseColor|pulseRate]|trailing...]`
fn parse_appearance(value: &str) -> Result<Appearance, CellError> {
    let err = |msg: String| CellError::InvalidAppearance(msg);
    let parts = bracket_list(value).ok_or_else(|| err(format!("`{}` is not a [..] list", value)))?;
    let (color_part, trailing) = parts
        .split_first()
        .ok_or_else(|| err("missing colour block".into()))?;

    let color_body = color_part
        .strip_prefix("C:")
        .ok_or_else(|| err(format!("first field `{}` must be a C:[..] colour block", color_part)))?;
    let colors = bracket_list(color_body)
        .ok_or_else(|| err(format!("colour block `{}` is not a [..] list", color_body)))?;
    let &[base, tint, tint_intensity, shift_rate, pulse_color, pulse_rate] = colors.as_slice() else {
        return Err(err(format!("colour block needs 6 fields, found {}", colors.len())));
    };

    if trailing.len() > APPEARANCE_TRAILING_FIELDS {
        return Err(err(format!(
            "at most {} fields may follow the colour block, found {}",
            APPEARANCE_TRAILING_FIELDS,
            trailing.len()
        )));
    }
    // Missing trailing fields read as "0"
    let field = |i: usize| trailing.get(i).copied().unwrap_or("0");

    let color = |name: &str, s: &str| -> Result<Option<Color>, CellError> {
        if s == "0" {
            return Ok(None);
        }
        Color::from_hex(s)
            .map(Some)
            .ok_or_else(|| err(format!("{} `{}` must be #RRGGBB or 0", name, s)))
    };
    let number = |name: &str, s: &str| -> Result<f32, CellError> {
        parse_decimal(s).ok_or_else(|| err(format!("{} `{}` must be a non-negative decimal", name, s)))
    };
    let word = |name: &str, s: &str| -> Result<Option<String>, CellError> {
        if s == "0" {
            Ok(None)
        } else if !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            Ok(Some(s.to_string()))
        } else {
            Err(err(format!("{} `{}` must be a word or 0", name, s)))
        }
    };

    Ok(Appearance {
        color: ColorBlock {
            base: color("base", base)?,
            tint: color("tint", tint)?,
            tint_intensity: number("tintIntensity", tint_intensity)?,
            shift_rate: number("shiftRate", shift_rate)?,
            pulse_color: color("pulseColor", pulse_color)?,
            pulse_rate: number("pulseRate", pulse_rate)?,
        },
        glow_color: color("glowColor", field(0))?,
        glow_intensity: number("glowIntensity", field(1))?,
        shadow_color: color("shadowColor", field(2))?,
        depth_offset: number("depthOffset", field(3))?,
        opacity: number("opacity", field(4))?,
        distortion_type: word("distortionType", field(5))?,
        distortion_intensity: number("distortionIntensity", field(6))?,
        blend_mode: word("blendMode", field(7))?,
        particle_type: word("particleType", field(8))?,
        particle_intensity: number("particleIntensity", field(9))?,
    })
}

/// `[pulseRate|pulseAmplitude|syncType]`
fn parse_animation(value: &str) -> Result<Animation, CellError> {
    let err = |msg: String| CellError::InvalidAnimation(msg);
    let parts = bracket_list(value).ok_or_else(|| err(format!("`{}` is not a [..] list", value)))?;
    let &[rate, amplitude, sync] = parts.as_slice() else {
        return Err(err(format!("expected 3 fields, found {}", parts.len())));
    };
    let pulse_rate = parse_decimal(rate).ok_or_else(|| err(format!("pulse rate `{}`", rate)))?;
    let pulse_amplitude =
        parse_decimal(amplitude).ok_or_else(|| err(format!("pulse amplitude `{}`", amplitude)))?;
    let sync = match sync {
        "beat" => SyncType::Beat,
        "timer" => SyncType::Timer,
        "0" => SyncType::None,
        other => return Err(err(format!("sync type `{}` must be beat, timer or 0", other))),
    };
    Ok(Animation {
        pulse_rate,
        pulse_amplitude,
        sync,
    })
}

/// Body of an `M:` segment: `<type>` or `<type>[k=v|...]`
fn parse_modifier(body: &str) -> Result<(ModifierKind, ModifierParams), CellError> {
    let err = |msg: String| CellError::InvalidModifier(msg);
    let (code_str, list) = match body.find('[') {
        Some(i) => (&body[..i], Some(&body[i..])),
        None => (body, None),
    };
    let code = parse_uint(code_str).ok_or_else(|| err(format!("type `{}` is not an integer", code_str)))?;
    let kind = ModifierKind::from_code(code)
        .ok_or_else(|| err(format!("type {} is not one of the modifier types 20-24", code)))?;

    let mut params = ModifierParams::new();
    if let Some(list) = list {
        let entries = bracket_list(list).ok_or_else(|| err(format!("`{}` is not a [..] list", list)))?;
        for entry in entries.into_iter().filter(|e| !e.is_empty()) {
            let (key, value) = entry
                .split_once('=')
                .ok_or_else(|| err(format!("parameter `{}` must be key=value", entry)))?;
            if !is_identifier(key) {
                return Err(err(format!("parameter name `{}` is not an identifier", key)));
            }
            if value.is_empty() || value.contains(['[', ']']) {
                return Err(err(format!("parameter `{}` has an invalid value", key)));
            }
            let value = match value.parse::<f64>() {
                Ok(n) if n.is_finite() => ParamValue::Number(n),
                _ => ParamValue::Text(value.to_string()),
            };
            if params.insert(key.to_string(), value).is_some() {
                return Err(err(format!("parameter `{}` given more than once", key)));
            }
        }
    }
    Ok((kind, params))
}

/// Split on `sep` where it is not nested inside brackets
fn split_top_level(s: &str, sep: char) -> Result<Vec<&str>, CellError> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| CellError::UnbalancedBrackets(s.to_string()))?;
            }
            c if c == sep && depth == 0 => {
                parts.push(&s[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(CellError::UnbalancedBrackets(s.to_string()));
    }
    parts.push(&s[start..]);
    Ok(parts)
}

/// Items of a `[a|b|c]` list, or None when `s` is not a single bracketed list
fn bracket_list(s: &str) -> Option<Vec<&str>> {
    let inner = s.strip_prefix('[')?.strip_suffix(']')?;
    // "[a]|[b]" would pass the prefix/suffix test; the inner text must balance
    let parts = split_top_level(inner, '|').ok()?;
    if inner.is_empty() {
        return Some(Vec::new());
    }
    Some(parts)
}

fn is_uint(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn parse_uint(s: &str) -> Option<u32> {
    if is_uint(s) { s.parse().ok() } else { None }
}

/// Non-negative decimal: digits with an optional fractional part
fn parse_decimal(s: &str) -> Option<f32> {
    let (whole, frac) = match s.split_once('.') {
        Some((w, f)) => (w, Some(f)),
        None => (s, None),
    };
    if !is_uint(whole) || frac.is_some_and(|f| !is_uint(f)) {
        return None;
    }
    s.parse().ok()
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl Cell {
    /// Canonical descriptor for this cell, omitting default-valued properties
    pub fn encode(&self) -> String {
        let mut props = Vec::new();

        match self.kind.modifier_kind() {
            Some(kind) if !self.params.is_empty() => {
                let params: Vec<String> = self
                    .params
                    .iter()
                    .map(|(k, v)| format!("{}={}", k, v))
                    .collect();
                props.push(format!("M:{}[{}]", kind.code(), params.join("|")));
            }
            Some(kind) => props.push(format!("M:{}", kind.code())),
            None => props.push(format!("T:{}", self.kind.code())),
        }

        if let Some(id) = &self.id {
            props.push(format!("I:{}", id));
        }
        if self.transform != Transform::default() {
            let t = &self.transform;
            props.push(format!("TR:[@{}|{}|{}]", t.rotation, t.scale, t.flip.as_str()));
        }
        if self.appearance != Appearance::default() {
            props.push(format!("AP:{}", encode_appearance(&self.appearance)));
        }
        if self.layer != 0 {
            props.push(format!("L:{}", self.layer));
        }
        if self.collision != self.kind.default_collision() {
            props.push(format!("CT:{}", self.collision.as_str()));
        }
        if self.group != 0 {
            props.push(format!("G:{}", self.group));
        }
        if self.lock != Lock::None {
            props.push(format!("LK:{}", self.lock.as_str()));
        }
        if self.animation != Animation::default() {
            let a = &self.animation;
            props.push(format!(
                "AN:[{}|{}|{}]",
                a.pulse_rate,
                a.pulse_amplitude,
                a.sync.as_str()
            ));
        }

        props.join("/")
    }
}

fn encode_appearance(ap: &Appearance) -> String {
    let color = |c: &Option<Color>| c.map(|c| c.to_hex()).unwrap_or_else(|| "0".into());
    let word = |w: &Option<String>| w.clone().unwrap_or_else(|| "0".into());
    let c = &ap.color;
    format!(
        "[C:[{}|{}|{}|{}|{}|{}]|{}|{}|{}|{}|{}|{}|{}|{}|{}|{}]",
        color(&c.base),
        color(&c.tint),
        c.tint_intensity,
        c.shift_rate,
        color(&c.pulse_color),
        c.pulse_rate,
        color(&ap.glow_color),
        ap.glow_intensity,
        color(&ap.shadow_color),
        ap.depth_offset,
        ap.opacity,
        word(&ap.distortion_type),
        ap.distortion_intensity,
        word(&ap.blend_mode),
        word(&ap.particle_type),
        ap.particle_intensity,
    )
}

/// Encode a whole matrix as rows of descriptors (`"0"` for empty)
pub fn encode_level(matrix: &Matrix) -> Vec<Vec<String>> {
    matrix
        .rows()
        .map(|row| {
            row.iter()
                .map(|c| c.as_ref().map(Cell::encode).unwrap_or_else(|| "0".into()))
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn cell(s: &str) -> Cell {
        parse_cell(s).unwrap().unwrap()
    }

    #[test]
    fn test_empty_forms() {
        assert_eq!(parse_value(&json!(0)).unwrap(), None);
        assert_eq!(parse_value(&json!("0")).unwrap(), None);
        assert_eq!(parse_value(&json!("")).unwrap(), None);
        assert_eq!(parse_value(&Value::Null).unwrap(), None);
    }

    #[test]
    fn test_legacy_forms_rewrite_to_type() {
        assert_eq!(parse_value(&json!(2)).unwrap(), Some(cell("T:2")));
        assert_eq!(parse_value(&json!("12")).unwrap(), Some(cell("T:12")));
        assert!(matches!(parse_value(&json!(-1)), Err(CellError::InvalidType(_))));
        assert!(matches!(parse_value(&json!(1.5)), Err(CellError::InvalidType(_))));
        assert!(matches!(parse_value(&json!(true)), Err(CellError::UnsupportedValue(_))));
    }

    #[test]
    fn test_full_descriptor() {
        let c = cell(
            "T:5/I:ab12Z/TR:[@-90|1.5|hv]/AP:[C:[#FF0000|0|0.5|0|#00ff00|2]|#0000FF|3]/L:4/CT:sticky/G:7/LK:off/AN:[1|0.25|beat]",
        );
        assert_eq!(c.kind, CellKind::TeleportIn);
        assert_eq!(c.id.as_deref(), Some("ab12Z"));
        assert_eq!(c.transform.rotation, -90);
        assert_eq!(c.transform.scale, 1.5);
        assert_eq!(c.transform.flip, Flip::Both);
        assert_eq!(c.appearance.color.base, Some(Color(0xff0000)));
        assert_eq!(c.appearance.color.tint, None);
        assert_eq!(c.appearance.color.pulse_color, Some(Color(0x00ff00)));
        assert_eq!(c.appearance.glow_color, Some(Color(0x0000ff)));
        assert_eq!(c.appearance.glow_intensity, 3.0);
        assert_eq!(c.appearance.opacity, 0.0);
        assert_eq!(c.layer, 4);
        assert_eq!(c.collision, Collision::Sticky);
        assert_eq!(c.group, 7);
        assert_eq!(c.lock, Lock::LockedOff);
        assert_eq!(c.animation.sync, SyncType::Beat);
        assert_eq!(c.animation.pulse_amplitude, 0.25);
    }

    #[test]
    fn test_missing_type_is_error() {
        assert_eq!(parse_cell("G:3"), Err(CellError::MissingType));
        assert_eq!(parse_cell("T:0/G:3"), Err(CellError::ZeroType));
    }

    #[test]
    fn test_invalid_type_cites_row_and_column() {
        let rows = vec![
            vec![json!(0), json!(1), json!(0)],
            vec![json!(0), json!(0), json!("T:abc")],
        ];
        let err = parse_level(&rows).unwrap_err();
        assert_eq!(err.row(), Some(1));
        assert_eq!(err.col(), Some(2));
        assert_eq!(err.cell_error(), Some(&CellError::InvalidType("abc".into())));
    }

    #[test]
    fn test_unknown_and_duplicate_properties() {
        assert_eq!(parse_cell("T:1/Q:3"), Err(CellError::UnknownProperty("Q".into())));
        assert_eq!(parse_cell("T:1/T:2"), Err(CellError::DuplicateProperty("T".into())));
        assert!(matches!(parse_cell("T:1/junk"), Err(CellError::MalformedProperty(_))));
        assert!(matches!(parse_cell("T:1/TR:[@0|1|0"), Err(CellError::UnbalancedBrackets(_))));
    }

    #[test]
    fn test_lock_requires_group() {
        assert_eq!(parse_cell("T:1/LK:off"), Err(CellError::LockWithoutGroup("off".into())));
        assert_eq!(parse_cell("T:1/LK:unlock/G:0"), Err(CellError::LockWithoutGroup("unlock".into())));
        assert_eq!(cell("T:1/LK:0").lock, Lock::None);
        assert_eq!(cell("T:3/LK:unlock/G:2").lock, Lock::Unlock);
        assert!(matches!(parse_cell("T:1/G:1/LK:on"), Err(CellError::InvalidLock(_))));
    }

    #[test]
    fn test_transform_validation() {
        assert_eq!(cell("T:4/TR:[@45|1|0]").transform.rotation, 45);
        assert_eq!(cell("T:4/TR:[0|2.5|v]").transform.flip, Flip::Vertical);
        assert!(matches!(parse_cell("T:4/TR:[45|1|0]"), Err(CellError::InvalidTransform(_))));
        assert!(matches!(parse_cell("T:4/TR:[@4x|1|0]"), Err(CellError::InvalidTransform(_))));
        assert!(matches!(parse_cell("T:4/TR:[@0|-1|0]"), Err(CellError::InvalidTransform(_))));
        assert!(matches!(parse_cell("T:4/TR:[@0|1|x]"), Err(CellError::InvalidTransform(_))));
        assert!(matches!(parse_cell("T:4/TR:[@0|1]"), Err(CellError::InvalidTransform(_))));
    }

    #[test]
    fn test_appearance_validation() {
        assert!(matches!(
            parse_cell("T:1/AP:[C:[#FF00|0|0|0|0|0]]"),
            Err(CellError::InvalidAppearance(_))
        ));
        assert!(matches!(
            parse_cell("T:1/AP:[C:[0|0|0|0|0]]"),
            Err(CellError::InvalidAppearance(_))
        ));
        assert!(matches!(
            parse_cell("T:1/AP:[C:[0|0|-1|0|0|0]]"),
            Err(CellError::InvalidAppearance(_))
        ));
        assert!(matches!(
            parse_cell("T:1/AP:[0|0|0]"),
            Err(CellError::InvalidAppearance(_))
        ));
        // 10 trailing fields is the limit
        assert!(parse_cell("T:1/AP:[C:[0|0|0|0|0|0]|0|0|0|0|0|0|0|0|0|0]").is_ok());
        assert!(matches!(
            parse_cell("T:1/AP:[C:[0|0|0|0|0|0]|0|0|0|0|0|0|0|0|0|0|0]"),
            Err(CellError::InvalidAppearance(_))
        ));
        let c = cell("T:1/AP:[C:[0|0|0|0|0|0]|0|0|0|0|0.8|wave|1|add|spark|2]");
        assert_eq!(c.appearance.opacity, 0.8);
        assert_eq!(c.appearance.distortion_type.as_deref(), Some("wave"));
        assert_eq!(c.appearance.blend_mode.as_deref(), Some("add"));
        assert_eq!(c.appearance.particle_type.as_deref(), Some("spark"));
        assert_eq!(c.appearance.particle_intensity, 2.0);
    }

    #[test]
    fn test_animation_validation() {
        assert_eq!(cell("T:1/AN:[2|1|timer]").animation.sync, SyncType::Timer);
        assert!(matches!(parse_cell("T:1/AN:[2|1|bar]"), Err(CellError::InvalidAnimation(_))));
        assert!(matches!(parse_cell("T:1/AN:[2|1]"), Err(CellError::InvalidAnimation(_))));
    }

    #[test]
    fn test_id_validation() {
        assert!(matches!(parse_cell("T:5/I:abcd"), Err(CellError::InvalidId(_))));
        assert!(matches!(parse_cell("T:5/I:abc-e"), Err(CellError::InvalidId(_))));
        assert!(matches!(parse_cell("T:1/L:-1"), Err(CellError::InvalidLayer(_))));
        assert!(matches!(parse_cell("T:1/G:x"), Err(CellError::InvalidGroup(_))));
        assert!(matches!(parse_cell("T:1/CT:bouncy"), Err(CellError::InvalidCollision(_))));
    }

    #[test]
    fn test_modifier_cells() {
        let c = cell("M:20[zoom=1.5|duration=300|ease=smooth]");
        assert_eq!(c.kind, CellKind::Modifier(ModifierKind::Zoom));
        assert_eq!(c.params.get("zoom"), Some(&ParamValue::Number(1.5)));
        assert_eq!(c.params.get("ease"), Some(&ParamValue::Text("smooth".into())));
        assert!(c.is_modifier());
        assert!(!c.is_trigger());
        assert_eq!(c.collision, Collision::Passthrough);

        let bare = cell("M:24");
        assert!(bare.params.is_empty());
        assert_eq!(cell("M:21[]"), cell("T:21"));

        let grouped = cell("M:22[angle=15]/G:4/LK:off");
        assert_eq!(grouped.group, 4);
        assert_eq!(grouped.lock, Lock::LockedOff);
        assert_eq!(cell("M:23/T:23").kind, CellKind::Modifier(ModifierKind::Pan));
    }

    #[test]
    fn test_modifier_errors() {
        assert!(matches!(parse_cell("M:3[x=1]"), Err(CellError::InvalidModifier(_))));
        assert!(matches!(parse_cell("M:20[zoom]"), Err(CellError::InvalidModifier(_))));
        assert!(matches!(parse_cell("M:20[1x=2]"), Err(CellError::InvalidModifier(_))));
        assert!(matches!(parse_cell("M:20[a=1|a=2]"), Err(CellError::InvalidModifier(_))));
        assert_eq!(
            parse_cell("M:20/T:21"),
            Err(CellError::ModifierTypeMismatch { modifier: 20, declared: 21 })
        );
        assert_eq!(parse_cell("M:20/M:21"), Err(CellError::DuplicateProperty("M".into())));
    }

    #[test]
    fn test_explicit_defaults_equal_minimal_cell() {
        for code in 1..=30u32 {
            let kind = CellKind::from_code(code).unwrap();
            let minimal = format!("T:{}", code);
            let explicit = format!(
                "T:{}/TR:[@0|1|0]/AP:[C:[0|0|0|0|0|0]]/L:0/CT:{}/G:0/LK:0/AN:[0|0|0]",
                code,
                kind.default_collision().as_str()
            );
            assert_eq!(parse_cell(&explicit), parse_cell(&minimal), "type {}", code);
        }
    }

    #[test]
    fn test_ct_overrides_default() {
        assert_eq!(cell("T:2").collision, Collision::Hazard);
        assert_eq!(cell("T:2/CT:passthrough").collision, Collision::Passthrough);
        assert_eq!(cell("T:1/CT:hazard").collision, Collision::Hazard);
    }

    #[test]
    fn test_level_json() {
        let m = parse_level_json(r#"[[0, 1, "T:2"], ["0", "M:20[zoom=2]", null]]"#).unwrap();
        assert_eq!(m.width(), 3);
        assert_eq!(m.height(), 2);
        assert_eq!(m.get(2, 0).map(|c| c.kind), Some(CellKind::Hazard));
        assert!(m.get(0, 1).is_none());

        assert!(matches!(parse_level_json("{}"), Err(LevelError::InvalidJson(_))));
        assert!(matches!(parse_level_json("[]"), Err(LevelError::Empty)));
        assert!(matches!(
            parse_level_json("[[1, 1], [1]]"),
            Err(LevelError::RaggedRow { row: 1, .. })
        ));
    }

    #[test]
    fn test_encode_level_reparses() {
        let m = parse_level_json(
            r#"[["T:1/G:2/LK:off", "M:24[scale=0.5|duration=800]"], ["T:5/I:aaaaa/TR:[@90|1|h]", 0]]"#,
        )
        .unwrap();
        let encoded = encode_level(&m);
        assert_eq!(encoded[1][1], "0");
        let rows: Vec<Vec<Value>> = encoded
            .into_iter()
            .map(|r| r.into_iter().map(Value::String).collect())
            .collect();
        assert_eq!(parse_level(&rows).unwrap(), m);
    }

    fn modifier_kind() -> impl Strategy<Value = ModifierKind> {
        prop::sample::select(ModifierKind::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn prop_modifiers_are_passthrough(kind in modifier_kind(), zoom in 0u32..1000) {
            let plain = cell(&format!("T:{}", kind.code()));
            let with_params = cell(&format!("M:{}[zoom={}]", kind.code(), zoom));
            for c in [plain, with_params] {
                prop_assert_eq!(c.collision, Collision::Passthrough);
                prop_assert!(c.is_modifier());
                prop_assert!(!c.is_trigger());
            }
        }

        #[test]
        fn prop_hazard_defaults_to_hazard(layer in 0u32..100, group in 0u32..50) {
            let c = cell(&format!("T:2/L:{}/G:{}", layer, group));
            prop_assert_eq!(c.collision, Collision::Hazard);
            let overridden = cell(&format!("T:2/L:{}/G:{}/CT:solid", layer, group));
            prop_assert_eq!(overridden.collision, Collision::Solid);
        }

        #[test]
        fn prop_encode_then_parse_is_identity(
            code in 1u32..30,
            rotation in -360i32..360,
            scale_pct in 0u32..400,
            layer in 0u32..10,
            group in 1u32..20,
            locked in any::<bool>(),
            base in prop::option::of(0u32..0x0100_0000),
        ) {
            let mut c = Cell::new(CellKind::from_code(code).unwrap())
                .with_rotation(rotation)
                .with_group(group, if locked { Lock::LockedOff } else { Lock::None });
            c.transform.scale = scale_pct as f32 / 100.0;
            c.layer = layer;
            c.appearance.color.base = base.map(Color);
            prop_assert_eq!(parse_cell(&c.encode()).unwrap(), Some(c));
        }
    }
}
