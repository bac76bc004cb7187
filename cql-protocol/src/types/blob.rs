use derive_more::Constructor;

/// Raw bytes bound as a `blob` value.
#[derive(PartialEq, Eq, Hash, Debug, Clone, Constructor, Default)]
#[repr(transparent)]
pub struct Blob(Vec<u8>);

impl Blob {
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        self.0.as_slice()
    }

    /// Returns underlying vector of bytes.
    #[inline]
    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }
}

impl From<Vec<u8>> for Blob {
    #[inline]
    fn from(vec: Vec<u8>) -> Self {
        Blob::new(vec)
    }
}

impl From<&[u8]> for Blob {
    #[inline]
    fn from(value: &[u8]) -> Self {
        Blob::new(value.to_vec())
    }
}
