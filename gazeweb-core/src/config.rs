/// Viewer configuration and its `key = value` file format
use nom::{
    branch::alt,
    bytes::complete::{take_till, take_while, take_while1},
    character::complete::{char, space0},
    combinator::{all_consuming, eof, opt, rest},
    number::complete::float,
    sequence::{delimited, preceded},
    IResult,
};
use std::path::Path;
use std::time::Duration;

use crate::error::{GazeError, Result};

/// Tunables for the viewer, defaulting to the stock Cardboard layout
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerConfig {
    pub z_near: f32,
    pub z_far: f32,
    /// Camera offset from the origin along +Z
    pub camera_z: f32,
    /// Distance of the content plane in front of the viewer
    pub object_distance: f32,
    pub pointer_half_size: f32,
    pub pointer_lift: f32,
    pub surface_width: u32,
    pub surface_height: u32,
    /// Surface pixels per half-unit of plane space, relative to half the surface size
    pub surface_scale: f32,
    pub click_duration_ms: u64,
    pub home_url: String,
    pub welcome_message: String,
    /// Simulated stereo rig: inter-pupillary distance in meters
    pub ipd: f32,
    /// Simulated stereo rig: vertical field of view in degrees
    pub fov_y_deg: f32,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            z_near: 0.1,
            z_far: 100.0,
            camera_z: 0.01,
            object_distance: 1.5,
            pointer_half_size: 0.005,
            pointer_lift: 0.05,
            surface_width: 3000,
            surface_height: 3000,
            surface_scale: 1.0,
            click_duration_ms: 10,
            home_url: "http://news.google.com".to_string(),
            welcome_message: "Pull the magnet when you want to click on screen with the red point."
                .to_string(),
            ipd: 0.063,
            fov_y_deg: 90.0,
        }
    }
}

impl ViewerConfig {
    pub fn click_duration(&self) -> Duration {
        Duration::from_millis(self.click_duration_ms)
    }

    /// Read and parse a config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| GazeError::Config(format!("failed to read {}: {}", path.display(), e)))?;
        Self::parse(&text)
    }

    /// Parse `key = value` lines on top of the defaults.
    ///
    /// `#` starts a comment, strings may be quoted. Unknown keys are errors.
    pub fn parse(input: &str) -> Result<Self> {
        let mut config = Self::default();
        for (index, line) in input.lines().enumerate() {
            let line_no = index + 1;
            let entry = match parse_line(line) {
                Ok((_, entry)) => entry,
                Err(e) => {
                    return Err(GazeError::Config(format!(
                        "line {}: malformed entry ({:?})",
                        line_no, e
                    )))
                }
            };
            if let Some((key, value)) = entry {
                config
                    .apply(key, value)
                    .map_err(|reason| GazeError::Config(format!("line {}: {}", line_no, reason)))?;
            }
        }
        config.validate()?;
        Ok(config)
    }

    fn apply(&mut self, key: &str, value: &str) -> std::result::Result<(), String> {
        match key {
            "z_near" => self.z_near = parse_f32(key, value)?,
            "z_far" => self.z_far = parse_f32(key, value)?,
            "camera_z" => self.camera_z = parse_f32(key, value)?,
            "object_distance" => self.object_distance = parse_f32(key, value)?,
            "pointer_half_size" => self.pointer_half_size = parse_f32(key, value)?,
            "pointer_lift" => self.pointer_lift = parse_f32(key, value)?,
            "surface_width" => self.surface_width = parse_u32(key, value)?,
            "surface_height" => self.surface_height = parse_u32(key, value)?,
            "surface_scale" => self.surface_scale = parse_f32(key, value)?,
            "click_duration_ms" => self.click_duration_ms = parse_u32(key, value)? as u64,
            "home_url" => self.home_url = value.to_string(),
            "welcome_message" => self.welcome_message = value.to_string(),
            "ipd" => self.ipd = parse_f32(key, value)?,
            "fov_y_deg" => self.fov_y_deg = parse_f32(key, value)?,
            _ => return Err(format!("unknown key `{}`", key)),
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let reals = [
            ("z_near", self.z_near),
            ("z_far", self.z_far),
            ("camera_z", self.camera_z),
            ("object_distance", self.object_distance),
            ("pointer_half_size", self.pointer_half_size),
            ("pointer_lift", self.pointer_lift),
            ("surface_scale", self.surface_scale),
            ("ipd", self.ipd),
            ("fov_y_deg", self.fov_y_deg),
        ];
        if let Some((key, value)) = reals.iter().find(|(_, v)| !v.is_finite()) {
            return Err(GazeError::Config(format!("`{}` must be finite (got {})", key, value)));
        }
        // The look-at eye must not sit on its target.
        if self.camera_z == 0.0 {
            return Err(GazeError::Config("camera_z must be non-zero".to_string()));
        }
        if self.pointer_lift < 0.0 {
            return Err(GazeError::Config("pointer_lift must not be negative".to_string()));
        }
        if !(self.z_near > 0.0 && self.z_near < self.z_far) {
            return Err(GazeError::Config(format!(
                "clip planes must satisfy 0 < z_near < z_far (got {} / {})",
                self.z_near, self.z_far
            )));
        }
        if self.object_distance <= 0.0 {
            return Err(GazeError::Config("object_distance must be positive".to_string()));
        }
        if self.pointer_half_size <= 0.0 {
            return Err(GazeError::Config("pointer_half_size must be positive".to_string()));
        }
        if self.surface_width == 0 || self.surface_height == 0 || self.surface_scale <= 0.0 {
            return Err(GazeError::Config(
                "surface size and scale must be positive".to_string(),
            ));
        }
        if !(self.fov_y_deg > 0.0 && self.fov_y_deg < 180.0) {
            return Err(GazeError::Config("fov_y_deg must be within (0, 180)".to_string()));
        }
        Ok(())
    }
}

fn parse_f32(key: &str, value: &str) -> std::result::Result<f32, String> {
    all_consuming(float::<&str, nom::error::Error<&str>>)(value)
        .map(|(_, v)| v)
        .map_err(|_| format!("`{}` expects a number, got `{}`", key, value))
}

fn parse_u32(key: &str, value: &str) -> std::result::Result<u32, String> {
    all_consuming(nom::character::complete::u32::<&str, nom::error::Error<&str>>)(value)
        .map(|(_, v)| v)
        .map_err(|_| format!("`{}` expects an unsigned integer, got `{}`", key, value))
}

fn parse_line(input: &str) -> IResult<&str, Option<(&str, &str)>> {
    let (input, _) = space0(input)?;
    let (input, entry) = opt(parse_entry)(input)?;
    let (input, _) = space0(input)?;
    let (input, _) = opt(preceded(char('#'), rest))(input)?;
    let (input, _) = eof(input)?;
    Ok((input, entry))
}

fn parse_entry(input: &str) -> IResult<&str, (&str, &str)> {
    let (input, key) = take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_')(input)?;
    let (input, _) = delimited(space0, char('='), space0)(input)?;
    let (input, value) = alt((
        delimited(char('"'), take_while(|c: char| c != '"'), char('"')),
        take_till(|c: char| c == '#'),
    ))(input)?;
    Ok((input, (key, value.trim_end())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camera_on_target_rejected() {
        let err = ViewerConfig::parse("camera_z = 0").unwrap_err();
        assert!(matches!(err, GazeError::Config(ref msg) if msg.contains("camera_z")));
    }

    #[test]
    fn test_non_finite_values_rejected() {
        assert!(ViewerConfig::parse("object_distance = inf").is_err());
        assert!(ViewerConfig::parse("z_far = inf").is_err());
        assert!(ViewerConfig::parse("ipd = nan").is_err());
        assert!(ViewerConfig::parse("pointer_lift = -0.05").is_err());
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = ViewerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.click_duration(), Duration::from_millis(10));
        assert_eq!(config.surface_width, 3000);
    }

    #[test]
    fn test_parse_overrides() {
        let text = r##"
# viewer tuning
object_distance = 2.5
surface_width=1000   # narrower surface
surface_scale = 3
home_url = "https://example.com/#top"
welcome_message = Look and pull
"##;
        let config = ViewerConfig::parse(text).unwrap();
        assert_eq!(config.object_distance, 2.5);
        assert_eq!(config.surface_width, 1000);
        assert_eq!(config.surface_scale, 3.0);
        assert_eq!(config.home_url, "https://example.com/#top");
        assert_eq!(config.welcome_message, "Look and pull");
        assert_eq!(config.z_far, 100.0);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = ViewerConfig::parse("zoom = 2").unwrap_err();
        assert!(err.to_string().contains("unknown key `zoom`"));
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn test_bad_number_rejected() {
        let err = ViewerConfig::parse("\nz_near = close").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_malformed_line_rejected() {
        assert!(ViewerConfig::parse("just words").is_err());
    }

    #[test]
    fn test_inverted_clip_planes_rejected() {
        assert!(ViewerConfig::parse("z_near = 10\nz_far = 1").is_err());
    }
}
