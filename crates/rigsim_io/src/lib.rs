//! Utilities for input/output.

use std::{
    fs::{self, File},
    io::{self, BufReader, Read, Write},
    path::Path,
};

/// Creates any directories missing in order for the given path to be valid.
pub fn create_directory_if_missing(path: impl AsRef<Path>) -> io::Result<()> {
    let path = path.as_ref();
    if path.extension().is_some() {
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
            _ => Ok(()),
        }
    } else {
        fs::create_dir_all(path)
    }
}

/// Creates the file at the given path, as well as any missing parent
/// directories.
pub fn create_file_and_required_directories(file_path: impl AsRef<Path>) -> io::Result<File> {
    create_directory_if_missing(&file_path)?;
    File::create(file_path)
}

/// Reads and returns the content of the specified text file.
pub fn read_text_file(file_path: impl AsRef<Path>) -> io::Result<String> {
    let file = File::open(file_path)?;
    let mut text = String::new();
    let _ = BufReader::new(file).read_to_string(&mut text)?;
    Ok(text)
}

/// Writes the given string as a text file with the specified path, regardless
/// of whether the file already exists.
pub fn write_text_file(text: &str, output_file_path: impl AsRef<Path>) -> io::Result<()> {
    let mut file = create_file_and_required_directories(output_file_path)?;
    write!(&mut file, "{text}")
}

/// Reads the RON (Rusty Object Notation) file at the given path and
/// deserializes the contents into an object of type `T`.
#[cfg(feature = "ron")]
pub fn parse_ron_file<T>(file_path: impl AsRef<Path>) -> anyhow::Result<T>
where
    T: for<'de> serde::de::Deserialize<'de>,
{
    use anyhow::Context;

    let file_path = file_path.as_ref();

    let text = read_text_file(file_path)
        .map_err(anyhow::Error::from)
        .with_context(|| format!("Could not open {}", file_path.display()))?;

    ron::from_str::<T>(&text)
        .map_err(anyhow::Error::from)
        .with_context(|| format!("Invalid syntax in {}", file_path.display()))
}

/// Serializes the given value of type `T` to pretty-printed RON (Rusty Object
/// Notation) and writes it to the given path.
#[cfg(feature = "ron")]
pub fn write_ron_file<T>(value: &T, output_file_path: impl AsRef<Path>) -> anyhow::Result<()>
where
    T: serde::Serialize,
{
    use anyhow::Context;

    let output_file_path = output_file_path.as_ref();

    let text = ron::ser::to_string_pretty(value, ron::ser::PrettyConfig::default())
        .with_context(|| format!("Could not serialize {}", output_file_path.display()))?;

    write_text_file(&text, output_file_path)
        .map_err(anyhow::Error::from)
        .with_context(|| format!("Could not write {}", output_file_path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temporary_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("rigsim_io_test_{}", std::process::id()))
            .join(name)
    }

    #[test]
    fn written_text_file_can_be_read_back() {
        let path = temporary_path("nested/dir/text.txt");
        write_text_file("deck level 12", &path).unwrap();
        assert_eq!(read_text_file(&path).unwrap(), "deck level 12");
    }

    #[test]
    fn reading_missing_file_fails() {
        assert!(read_text_file(temporary_path("missing.txt")).is_err());
    }

    #[cfg(feature = "ron")]
    #[test]
    fn parsing_ron_file_with_invalid_syntax_fails_with_path_in_message() {
        let path = temporary_path("invalid.ron");
        write_text_file("(depth: ", &path).unwrap();
        let error = parse_ron_file::<(f64,)>(&path).unwrap_err();
        assert!(format!("{error:#}").contains("invalid.ron"));
    }

    #[cfg(feature = "ron")]
    #[test]
    fn ron_file_written_from_value_parses_to_same_value() {
        let path = temporary_path("values.ron");
        let values = vec![(1_u32, 2.5_f64), (2, -0.25)];
        write_ron_file(&values, &path).unwrap();
        let parsed: Vec<(u32, f64)> = parse_ron_file(&path).unwrap();
        assert_eq!(parsed, values);
    }
}
