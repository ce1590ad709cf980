use std::{collections::HashMap, path::Path};

use marquee_core::{codec::Codec, happening::Happening, id::HappeningId};

use crate::{Error, encode, file};

/// Reads and writes a catalog as one JSON document.
#[derive(Debug, Clone, Copy)]
pub struct JsonCodec {
  pretty: bool,
}

impl Default for JsonCodec {
  fn default() -> Self { Self { pretty: true } }
}

impl JsonCodec {
  /// Indented output.
  pub fn new() -> Self { Self::default() }

  /// Single-line output.
  pub fn compact() -> Self { Self { pretty: false } }

  pub fn is_pretty(&self) -> bool { self.pretty }

  fn write(&self, happenings: &[&Happening], destination: &Path) -> crate::Result<()> {
    let bytes = encode::to_vec(happenings, self.pretty).map_err(|e| Error::Io {
      path:   destination.to_path_buf(),
      source: e.into(),
    })?;
    file::write_atomic(destination, &bytes)?;
    tracing::debug!(
      count = happenings.len(),
      bytes = bytes.len(),
      path = %destination.display(),
      "wrote catalog document"
    );
    Ok(())
  }

  fn read(&self, source: &Path) -> crate::Result<HashMap<HappeningId, Happening>> {
    let Some(bytes) = file::read_if_present(source)? else {
      tracing::debug!(path = %source.display(), "no catalog document; starting empty");
      return Ok(HashMap::new());
    };
    let happenings = encode::from_slice(&bytes)?;
    tracing::debug!(
      count = happenings.len(),
      path = %source.display(),
      "read catalog document"
    );
    Ok(happenings.into_iter().map(|h| (h.id(), h)).collect())
  }
}

impl Codec for JsonCodec {
  fn serialize(
    &self,
    happenings: &[&Happening],
    destination: &Path,
  ) -> marquee_core::Result<()> {
    Ok(self.write(happenings, destination)?)
  }

  fn deserialize(
    &self,
    source: &Path,
  ) -> marquee_core::Result<HashMap<HappeningId, Happening>> {
    Ok(self.read(source)?)
  }
}
