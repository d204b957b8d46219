use anyhow::Result;
use autocurator_catalog::{DatasetReader, DuplicatePolicy, JsonHeaderReader};
use clap::ValueEnum;

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum ReaderFlag {
    /// JSON header files describing each data file
    Header,
    /// NetCDF files (requires the `netcdf` feature)
    Netcdf,
}

impl ReaderFlag {
    /// NetCDF when compiled in, header files otherwise.
    pub(crate) const fn build_default() -> Self {
        if cfg!(feature = "netcdf") {
            ReaderFlag::Netcdf
        } else {
            ReaderFlag::Header
        }
    }

    pub(crate) fn open(self) -> Result<Box<dyn DatasetReader>> {
        match self {
            ReaderFlag::Header => Ok(Box::new(JsonHeaderReader::new())),
            ReaderFlag::Netcdf => netcdf_reader(),
        }
    }
}

#[cfg(feature = "netcdf")]
fn netcdf_reader() -> Result<Box<dyn DatasetReader>> {
    Ok(Box::new(autocurator_catalog::NetcdfReader::new()))
}

#[cfg(not(feature = "netcdf"))]
fn netcdf_reader() -> Result<Box<dyn DatasetReader>> {
    anyhow::bail!("NetCDF support is not compiled in; rebuild with `--features netcdf` or use `--reader header`")
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum DuplicatesFlag {
    Reject,
    KeepFirst,
}

impl DuplicatesFlag {
    pub(crate) const fn as_domain(self) -> DuplicatePolicy {
        match self {
            DuplicatesFlag::Reject => DuplicatePolicy::Reject,
            DuplicatesFlag::KeepFirst => DuplicatePolicy::KeepFirst,
        }
    }
}
