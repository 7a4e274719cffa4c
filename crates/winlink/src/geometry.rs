use std::path::PathBuf;

use tracing::warn;
use winlink_core::{GeometrySource, WindowShape};

/// Parse `x y w h`; commas are accepted as separators too.
pub fn parse_shape(raw: &str) -> Option<WindowShape> {
    let fields: Vec<i32> = raw
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|f| !f.is_empty())
        .map(str::parse)
        .collect::<Result<_, _>>()
        .ok()?;

    match fields.as_slice() {
        [x, y, w, h] => Some(WindowShape::new(*x, *y, *w, *h)),
        _ => None,
    }
}

/// Geometry read from a file on every frame, so another program (or a test)
/// can move the window by rewriting it.
///
/// An unreadable or malformed file keeps the last good shape.
pub struct FileGeometry {
    path: PathBuf,
    last: WindowShape,
    warned: bool,
}

impl FileGeometry {
    pub fn new(path: PathBuf, initial: WindowShape) -> Self {
        Self {
            path,
            last: initial,
            warned: false,
        }
    }
}

impl GeometrySource for FileGeometry {
    fn current_shape(&mut self) -> WindowShape {
        match std::fs::read_to_string(&self.path)
            .ok()
            .and_then(|raw| parse_shape(&raw))
        {
            Some(shape) => {
                self.last = shape;
                self.warned = false;
            }
            None if !self.warned => {
                warn!(
                    event = "cli.geometry.read_failed",
                    path = %self.path.display(),
                    "Keeping last known shape"
                );
                self.warned = true;
            }
            None => {}
        }
        self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_parse_shape() {
        assert_eq!(parse_shape("1 2 3 4"), Some(WindowShape::new(1, 2, 3, 4)));
        assert_eq!(
            parse_shape("-10, 20, 300, 400\n"),
            Some(WindowShape::new(-10, 20, 300, 400))
        );
        assert_eq!(parse_shape("1 2 3"), None);
        assert_eq!(parse_shape("1 2 3 4 5"), None);
        assert_eq!(parse_shape("a b c d"), None);
    }

    #[test]
    fn test_file_geometry_follows_file() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("shape");
        let mut source = FileGeometry::new(path.clone(), WindowShape::new(0, 0, 10, 10));

        // Missing file keeps the initial shape
        assert_eq!(source.current_shape(), WindowShape::new(0, 0, 10, 10));

        fs::write(&path, "5 5 100 100").unwrap();
        assert_eq!(source.current_shape(), WindowShape::new(5, 5, 100, 100));

        fs::write(&path, "garbage").unwrap();
        assert_eq!(source.current_shape(), WindowShape::new(5, 5, 100, 100));
    }
}
