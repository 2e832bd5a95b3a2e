//! At-rest storage of the authority key pair.

use std::{
    fs::{self, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
    sync::Mutex,
    thread,
    time::Duration,
};

use tracing::debug;
use zeroize::Zeroizing;

use crate::{
    api::Cpabe,
    bytes_ser_de::Serializable,
    config::SchemeConfig,
    core::{MasterSecret, PublicParams},
    Error,
};

pub const PUBLIC_KEY_FILE: &str = "public_key.dat";
pub const MASTER_SECRET_KEY_FILE: &str = "master_secret_key.dat";

/// Serializes the initializations of the stores of this process.
static INIT_LOCK: Mutex<()> = Mutex::new(());

/// Another process may be initializing the store: its files are then
/// reloaded until they are complete.
const LOAD_ATTEMPTS: u32 = 20;
const LOAD_RETRY_DELAY: Duration = Duration::from_millis(50);

/// Directory holding `public_key.dat` and `master_secret_key.dat`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyStore {
    dir: PathBuf,
}

impl KeyStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn public_key_path(&self) -> PathBuf {
        self.dir.join(PUBLIC_KEY_FILE)
    }

    #[must_use]
    pub fn master_secret_key_path(&self) -> PathBuf {
        self.dir.join(MASTER_SECRET_KEY_FILE)
    }

    /// Loads the key pair, running the setup first if the store is empty.
    ///
    /// A store holding only the master secret is being initialized by
    /// another process and is waited for.
    ///
    /// # Error
    ///
    /// Returns an `InvalidData` I/O error if only one of the two files
    /// exists after that wait: the store is then left untouched.
    pub fn load_or_init(
        &self,
        cpabe: &Cpabe,
        config: SchemeConfig,
    ) -> Result<(PublicParams, MasterSecret), Error> {
        let _guard = INIT_LOCK.lock().expect("poisoned mutex");

        match (
            self.public_key_path().exists(),
            self.master_secret_key_path().exists(),
        ) {
            (true, true) => self.load_when_complete(),
            (false, false) => {
                fs::create_dir_all(&self.dir)?;
                let (pp, msk) = cpabe.setup(config)?;
                match self.create(&pp, &msk) {
                    Ok(()) => {
                        debug!(dir = %self.dir.display(), "initialized key store");
                        Ok((pp, msk))
                    }
                    // another process initialized the store in the meantime
                    Err(Error::Io(e)) if e.kind() == io::ErrorKind::AlreadyExists => {
                        self.load_when_complete()
                    }
                    Err(e) => Err(e),
                }
            }
            // the master secret is written first
            (false, true) => self.load_when_complete(),
            (true, false) => Err(self.inconsistent(PUBLIC_KEY_FILE)),
        }
    }

    /// Loads the public parameters, for callers that only encrypt.
    pub fn load_public_params(&self) -> Result<PublicParams, Error> {
        PublicParams::deserialize(&fs::read(self.public_key_path())?)
    }

    fn load(&self) -> Result<(PublicParams, MasterSecret), Error> {
        let pp = self.load_public_params()?;
        let bytes = Zeroizing::new(fs::read(self.master_secret_key_path())?);
        let msk = MasterSecret::deserialize(&bytes)?;
        debug!(dir = %self.dir.display(), "loaded key store");
        Ok((pp, msk))
    }

    fn load_when_complete(&self) -> Result<(PublicParams, MasterSecret), Error> {
        let mut attempt = 1;
        loop {
            match self.load() {
                Ok(keys) => return Ok(keys),
                Err(e) if attempt < LOAD_ATTEMPTS => {
                    debug!(dir = %self.dir.display(), attempt, "key store not ready: {e}");
                    attempt += 1;
                    thread::sleep(LOAD_RETRY_DELAY);
                }
                Err(_) if !self.public_key_path().exists() => {
                    return Err(self.inconsistent(MASTER_SECRET_KEY_FILE))
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn inconsistent(&self, existing: &str) -> Error {
        Error::Io(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "inconsistent key store {}: only {existing} exists",
                self.dir.display()
            ),
        ))
    }

    /// Writes the master secret, then the public parameters. Both files must
    /// not exist.
    fn create(&self, pp: &PublicParams, msk: &MasterSecret) -> Result<(), Error> {
        write_new(&self.master_secret_key_path(), &msk.serialize()?)?;
        write_new(&self.public_key_path(), &pp.serialize()?)
    }
}

fn write_new(path: &Path, bytes: &[u8]) -> Result<(), Error> {
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    Ok(())
}
