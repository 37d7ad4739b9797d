//! Reference-file staging.
//!
//! Simulated exposures lean on large reference bundles (instrument
//! calibration files, cosmic-ray libraries, PSF libraries, dark current
//! exposures) hosted as direct-download links. This module assembles the
//! download list for a requested instrument/library/dark combination,
//! fetches each file, and unpacks it into the on-disk layout the
//! simulation pipeline expects under `<dir>/sim_data/`.

use flate2::read::GzDecoder;
use log::info;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReferenceDataError {
    #[error("failed to fetch {url}")]
    Http {
        url: String,
        #[source]
        source: Box<ureq::Error>,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("unknown instrument '{0}' (expected nircam, niriss, fgs, or all)")]
    UnknownInstrument(String),
}

/// Instruments with published reference bundles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instrument {
    NirCam,
    NirIss,
    Fgs,
}

impl Instrument {
    /// Directory name of this instrument under the staged data tree.
    pub fn data_dir(&self) -> &'static str {
        match self {
            Instrument::NirCam => "nircam",
            Instrument::NirIss => "niriss",
            Instrument::Fgs => "fgs",
        }
    }
}

impl FromStr for Instrument {
    type Err = ReferenceDataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "nircam" => Ok(Instrument::NirCam),
            "niriss" => Ok(Instrument::NirIss),
            "fgs" => Ok(Instrument::Fgs),
            other => Err(ReferenceDataError::UnknownInstrument(other.to_string())),
        }
    }
}

/// Parse a comma-separated instrument list; "all" expands to every
/// instrument.
pub fn parse_instruments(list: &str) -> Result<Vec<Instrument>, ReferenceDataError> {
    let names: Vec<&str> = list.split(',').map(str::trim).collect();
    if names.iter().any(|n| n.eq_ignore_ascii_case("all")) {
        return Ok(vec![Instrument::NirCam, Instrument::NirIss, Instrument::Fgs]);
    }
    names.iter().map(|n| n.parse()).collect()
}

/// Which PSF library generation to download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PsfLibraryVariant {
    /// Gridded PSF models (not yet published; selecting this downloads
    /// nothing for the PSF portion).
    Gridded,
    /// Libraries of individual sub-pixel-position PSF files.
    SubPixel,
}

/// Which dark current exposures to download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DarkType {
    Linearized,
    Raw,
    Both,
}

type UrlTable = &'static [(&'static str, &'static str)];

const NIRCAM_REFFILES: UrlTable = &[(
    "https://stsci.box.com/s/6eomezd68n3surgqut8if6gy8l6lf3xk",
    "nircam_reference_files.tar.gz",
)];
const NIRISS_REFFILES: UrlTable = &[(
    "https://stsci.box.com/s/evlv7vxszgmiff3zdmdxnol6u6h8pa9j",
    "niriss_reference_files.tar.gz",
)];
const FGS_REFFILES: UrlTable = &[(
    "https://stsci.box.com/s/ia5z21m69tb08hd5zpv01c43g0px3gfm",
    "fgs_reference_files.tar.gz",
)];

const NIRCAM_CR_LIBRARY: UrlTable = &[(
    "https://stsci.box.com/s/4cw7wmsqw9qhdozl4owz0tmr6ozusfqr",
    "nircam_cr_library.tar.gz",
)];
const NIRISS_CR_LIBRARY: UrlTable = &[(
    "https://stsci.box.com/s/uxyb08cjkf1i7yd4fhryrhi6dr4da9pg",
    "niriss_cr_library.tar.gz",
)];
const FGS_CR_LIBRARY: UrlTable = &[(
    "https://stsci.box.com/s/d5oswszqbwt6i027g6ue3usi47dmyign",
    "fgs_cr_library.tar.gz",
)];

const NIRCAM_SUBPIX_PSF: UrlTable = &[
    (
        "https://stsci.box.com/s/4rw5p9dd8ofa13pnmgfgz1svr8qustcv",
        "nircam_a1_subpix_grid_webbpsf_library.tar.gz",
    ),
    (
        "https://stsci.box.com/s/ngx0mfo6pppe9zbrvzh28n90fe6v4d6i",
        "nircam_a2_subpix_grid_webbpsf_library.tar.gz",
    ),
    (
        "https://stsci.box.com/s/nc2tt2w4cbylwy0ny7bxme37xtnd26cm",
        "nircam_a3_subpix_grid_webbpsf_library.tar.gz",
    ),
    (
        "https://stsci.box.com/s/27bkgppw3ajyhfvl6nnv2wt9mlcn0ae9",
        "nircam_a4_subpix_grid_webbpsf_library.tar.gz",
    ),
    (
        "https://stsci.box.com/s/gg48crkex2afjqb11replcg0gs2bm5cv",
        "nircam_a5_subpix_grid_webbpsf_library.tar.gz",
    ),
    (
        "https://stsci.box.com/s/tg2pjk829oc73ijl9kda0j4ccagg75ce",
        "nircam_b1_subpix_grid_webbpsf_library.tar.gz",
    ),
    (
        "https://stsci.box.com/s/7vmp33fb6hwcyesl39z7v7rcgpq4ls5x",
        "nircam_b2_subpix_grid_webbpsf_library.tar.gz",
    ),
    (
        "https://stsci.box.com/s/55yf2n72l0xlc6u6t6igv5e8u8zcnunq",
        "nircam_b3_subpix_grid_webbpsf_library.tar.gz",
    ),
    (
        "https://stsci.box.com/s/5gbse7nhpwnfptpip5bci3uyt0sate4y",
        "nircam_b4_subpix_grid_webbpsf_library.tar.gz",
    ),
    (
        "https://stsci.box.com/s/b3fepnceqznfmwct9sszoc2lzxl8iaku",
        "nircam_b5_subpix_grid_webbpsf_library.tar.gz",
    ),
];

const NIRISS_SUBPIX_PSF: UrlTable = &[
    (
        "https://stsci.box.com/s/29z7ounfn61gjwi3kiu04hc0f8qgaot9",
        "niriss_subpix_grid_f090w_webbpsf_library.tar.gz",
    ),
    (
        "https://stsci.box.com/s/i5yhe4zbzxawnah8csdpp4qtk9dmao1t",
        "niriss_subpix_grid_f115w_webbpsf_library.tar.gz",
    ),
    (
        "https://stsci.box.com/s/s1j1kpx0aes1ntf4qrlyl1mhitj0sz2u",
        "niriss_subpix_grid_f140m_webbpsf_library.tar.gz",
    ),
    (
        "https://stsci.box.com/s/cc5kjqp78uvtrmlpd0jk6llobajkhavr",
        "niriss_subpix_grid_f150w_webbpsf_library.tar.gz",
    ),
    (
        "https://stsci.box.com/s/g0lwik43s7erbpsm6r5slq1739bnjob9",
        "niriss_subpix_grid_f158m_webbpsf_library.tar.gz",
    ),
    (
        "https://stsci.box.com/s/70utbxqfmi474hxb34uawjnrujilj6hb",
        "niriss_subpix_grid_f200w_webbpsf_library.tar.gz",
    ),
    (
        "https://stsci.box.com/s/jorfqdq56u73wlnj9nk0r34o36ruc8ky",
        "niriss_subpix_grid_f277w_webbpsf_library.tar.gz",
    ),
    (
        "https://stsci.box.com/s/edafbfzxc4iijr5rzfkziasu64quh6lb",
        "niriss_subpix_grid_f356w_webbpsf_library.tar.gz",
    ),
    (
        "https://stsci.box.com/s/oqsriubvc0knwtrsoavxj8gi7psz2yck",
        "niriss_subpix_grid_f380m_webbpsf_library.tar.gz",
    ),
    (
        "https://stsci.box.com/s/i6c28jii139x8dnzxy6bp3fnm25npnvw",
        "niriss_subpix_grid_f430m_webbpsf_library.tar.gz",
    ),
    (
        "https://stsci.box.com/s/fjep4n3dhw2uavt0uk07dfk65dww1zp8",
        "niriss_subpix_grid_f444w_webbpsf_library.tar.gz",
    ),
    (
        "https://stsci.box.com/s/3cg3397siwiirv64hpez5uc9oyaey5d8",
        "niriss_subpix_grid_f480m_webbpsf_library.tar.gz",
    ),
    (
        "https://stsci.box.com/s/rk38t0psx4kmqx5wxqsmlrntzusm4aod",
        "niriss_nrm_subpix_grid_f277w_webbpsf_library.tar.gz",
    ),
    (
        "https://stsci.box.com/s/x2c99ivjzze0ixdywtoczoyi438mw76m",
        "niriss_nrm_subpix_grid_f380m_webbpsf_library.tar.gz",
    ),
    (
        "https://stsci.box.com/s/lwwei3atsbo64iz10c3blru5fnbof69u",
        "niriss_nrm_subpix_grid_f430m_webbpsf_library.tar.gz",
    ),
    (
        "https://stsci.box.com/s/7mxdonrlx9qz1mxmfgjzfg6bqwc5fzi3",
        "niriss_nrm_subpix_grid_f480m_webbpsf_library.tar.gz",
    ),
];

const FGS_SUBPIX_PSF: UrlTable = &[(
    "https://stsci.box.com/s/3g8f3i0w24l4yqu0bpin5uei7e5or9uh",
    "fgs_subpix_grid_webbpsf_library.tar.gz",
)];

// Gridded PSF model libraries have not been published yet.
const NIRCAM_GRIDDED_PSF: UrlTable = &[];
const NIRISS_GRIDDED_PSF: UrlTable = &[];
const FGS_GRIDDED_PSF: UrlTable = &[];

const NIRCAM_RAW_DARKS: UrlTable = &[
    (
        "https://stsci.box.com/s/pctjgthruh86ctr6ww9bgzccjlzc0xt3",
        "NRCNRCA1-DARK-60082202011_1_481_SE_2016-01-09T00h03m58_level1b_uncal.fits",
    ),
    (
        "https://stsci.box.com/s/df2bxy3iwenot0ykti06xqwnn1j9k0ii",
        "NRCNRCA1-DARK-60090213141_1_481_SE_2016-01-09T02h53m12_level1b_uncal.fits",
    ),
    (
        "https://stsci.box.com/s/rv8x4snxwqznymy92h40c70f7c7k8zh7",
        "NRCNRCA1-DARK-60090604481_1_481_SE_2016-01-09T06h52m47_level1b_uncal.fits",
    ),
    (
        "https://stsci.box.com/s/v0h1ndnnbgiar4wcx1ynl0ueli4ksz57",
        "NRCNRCA1-DARK-60091005411_1_481_SE_2016-01-09T10h56m36_level1b_uncal.fits",
    ),
    (
        "https://stsci.box.com/s/c1u5iwte7brjlm2dhqfibbw6ylqyshjv",
        "NRCNRCA1-DARK-60091434481_1_481_SE_2016-01-09T15h50m45_level1b_uncal.fits",
    ),
];
const NIRCAM_LINEARIZED_DARKS: UrlTable = &[
    (
        "https://stsci.box.com/s/dchmjjmepngpdo4xrabk8d5h1q63m3hf",
        "Linearized_Dark_and_SBRefpix_NRCNRCA1-DARK-60082202011_1_481_SE_2016-01-09T00h03m58_uncal.fits",
    ),
    (
        "https://stsci.box.com/s/z5fp0yhy7hydb3m59yevgxif8b9rrg8f",
        "Linearized_Dark_and_SBRefpix_NRCNRCA1-DARK-60090213141_1_481_SE_2016-01-09T02h53m12_uncal.fits",
    ),
    (
        "https://stsci.box.com/s/mqbwnwx8vjibgd50hahtd4i5qvc1mo0p",
        "Linearized_Dark_and_SBRefpix_NRCNRCA1-DARK-60090604481_1_481_SE_2016-01-09T06h52m47_uncal.fits",
    ),
    (
        "https://stsci.box.com/s/dc0y3k95jo5pd3yhskig4bimvgfjkopl",
        "Linearized_Dark_and_SBRefpix_NRCNRCA1-DARK-60091005411_1_481_SE_2016-01-09T10h56m36_uncal.fits",
    ),
    (
        "https://stsci.box.com/s/8j4jbzis927j74m6eizy90n0l5ukbd2g",
        "Linearized_Dark_and_SBRefpix_NRCNRCA1-DARK-60091434481_1_481_SE_2016-01-09T15h50m45_uncal.fits",
    ),
];

const NIRISS_RAW_DARKS: UrlTable = &[(
    "https://stsci.box.com/s/1pr9cfwx2d8r6iju9afmhsylowtwq3x4",
    "NISNIRISSDARK-153451235_11_496_SE_2015-12-11T16h05m20_dms_uncal.fits",
)];
const NIRISS_LINEARIZED_DARKS: UrlTable = &[(
    "https://stsci.box.com/s/nte0e1k6mtmym50kqe5wlngg6ambm6j2",
    "Linearized_Dark_and_SBRefpix_NISNIRISSDARK-153451235_17_496_SE_2015-12-11T17h59m52_dms_uncal_linear_dark_prep_object.fits",
)];

const FGS_RAW_DARKS: UrlTable = &[
    (
        "https://stsci.box.com/s/2nhm4pajg1d3b3vmj8p5wtsevxq41qsj",
        "29722_1x88_FGSF03512-D-NR-G2-5339214947_1_498_SE_2015-12-05T22h27m19_dms_uncal.fits",
    ),
    (
        "https://stsci.box.com/s/yq0pvyur651h8v1fz9t5wronvtbhv76b",
        "29782_1x88_FGSF03872-PAR-5340074326_1_498_SE_2015-12-06T12h22m47_dms_uncal.fits",
    ),
    (
        "https://stsci.box.com/s/72byn3psj6g3oawh3kp6fx5szfy1ahfs",
        "29813_1x88_FGSF037221-MR-2-5340161743_1_498_SE_2015-12-06T16h45m10_dms_uncal.fits",
    ),
    (
        "https://stsci.box.com/s/kqp2rmgff8esq2dyi5zeduaayunyhgtz",
        "30632_1x88_FGSF03511-D-NR-G1-5346180117_1_497_SE_2015-12-12T19h00m12_dms_uncal.fits",
    ),
];
const FGS_LINEARIZED_DARKS: UrlTable = &[
    (
        "https://stsci.box.com/s/6y0rsqgongmyp9cffqwd6k2k3ivl6pjf",
        "29722_1x88_FGSF03512-D-NR-G2-5339214947_1_498_SE_2015-12-05T22h27m19_dms_uncal_linearized.fits",
    ),
    (
        "https://stsci.box.com/s/t7xyd85wcvvxgzaeh26wlmstmp437g39",
        "29782_1x88_FGSF03872-PAR-5340074326_1_498_SE_2015-12-06T12h22m47_dms_uncal_linearized.fits",
    ),
    (
        "https://stsci.box.com/s/y5dr624wwc3rf7iadc51dblw9vn5bavf",
        "29813_1x88_FGSF037221-MR-2-5340161743_1_498_SE_2015-12-06T16h45m10_dms_uncal_linearized.fits",
    ),
    (
        "https://stsci.box.com/s/xg35tec3ohaeihmp1qpiktur2y9lnfem",
        "30632_1x88_FGSF03511-D-NR-G1-5346180117_1_497_SE_2015-12-12T19h00m12_dms_uncal_linearized.fits",
    ),
];

/// The (url, file name) pairs to download for the requested combination
/// of instruments, PSF library variant, and dark current type.
pub fn file_list(
    instruments: &[Instrument],
    psf_variant: PsfLibraryVariant,
    dark_type: DarkType,
) -> Vec<(&'static str, &'static str)> {
    let mut urls = Vec::new();

    for instrument in instruments {
        let (reffiles, cr_library, gridded, subpix, linearized, raw) = match instrument {
            Instrument::NirCam => (
                NIRCAM_REFFILES,
                NIRCAM_CR_LIBRARY,
                NIRCAM_GRIDDED_PSF,
                NIRCAM_SUBPIX_PSF,
                NIRCAM_LINEARIZED_DARKS,
                NIRCAM_RAW_DARKS,
            ),
            Instrument::NirIss => (
                NIRISS_REFFILES,
                NIRISS_CR_LIBRARY,
                NIRISS_GRIDDED_PSF,
                NIRISS_SUBPIX_PSF,
                NIRISS_LINEARIZED_DARKS,
                NIRISS_RAW_DARKS,
            ),
            Instrument::Fgs => (
                FGS_REFFILES,
                FGS_CR_LIBRARY,
                FGS_GRIDDED_PSF,
                FGS_SUBPIX_PSF,
                FGS_LINEARIZED_DARKS,
                FGS_RAW_DARKS,
            ),
        };

        urls.extend_from_slice(reffiles);
        urls.extend_from_slice(cr_library);
        urls.extend_from_slice(match psf_variant {
            PsfLibraryVariant::Gridded => gridded,
            PsfLibraryVariant::SubPixel => subpix,
        });
        if matches!(dark_type, DarkType::Linearized | DarkType::Both) {
            urls.extend_from_slice(linearized);
        }
        if matches!(dark_type, DarkType::Raw | DarkType::Both) {
            urls.extend_from_slice(raw);
        }
    }

    urls
}

/// Download `url` into `output_directory` as `file_name`, streaming the
/// body to disk.
pub fn download_file(
    url: &str,
    file_name: &str,
    output_directory: &Path,
) -> Result<PathBuf, ReferenceDataError> {
    let response = ureq::get(url).call().map_err(|e| ReferenceDataError::Http {
        url: url.to_string(),
        source: Box::new(e),
    })?;

    let path = output_directory.join(file_name);
    let mut reader = response.into_body().into_reader();
    let mut file = File::create(&path)?;
    io::copy(&mut reader, &mut file)?;
    Ok(path)
}

/// Destination directory for a dark current exposure, keyed off its file
/// name: `<dir>/sim_data/<instrument>/darks/<linearized|raw>` with a
/// per-detector subdirectory for multi-detector instruments.
fn dark_destination(directory: &Path, file_name: &str) -> PathBuf {
    let cal = if file_name.to_lowercase().contains("linearized")
        || file_name.to_lowercase().contains("linear_dark")
    {
        "linearized"
    } else {
        "raw"
    };

    let base = directory.join("sim_data");
    if let Some(rest) = file_name.split("NRCNRC").nth(1) {
        // Detector tag, with the long-wavelength alias folded to its
        // numeric form (ALONG -> A5)
        let det = rest.split('-').next().unwrap_or("").replace("LONG", "5");
        base.join("nircam").join("darks").join(cal).join(det)
    } else if file_name.to_lowercase().contains("niriss") {
        base.join("niriss").join("darks").join(cal)
    } else {
        base.join("fgs").join("darks").join(cal)
    }
}

/// Download and stage every reference file for the requested combination.
///
/// Gzipped tarballs are expanded in place under `directory`; dark current
/// exposures are moved into the `sim_data` tree at the location
/// [`dark_destination`] computes.
pub fn download_reference_files(
    directory: &Path,
    instruments: &[Instrument],
    psf_variant: PsfLibraryVariant,
    dark_type: DarkType,
) -> Result<(), ReferenceDataError> {
    fs::create_dir_all(directory)?;

    for (url, file_name) in file_list(instruments, psf_variant, dark_type) {
        info!("downloading {file_name}");
        let local = download_file(url, file_name, directory)?;

        if file_name.ends_with(".tar.gz") {
            info!("extracting {file_name}");
            let tarball = File::open(&local)?;
            let mut archive = tar::Archive::new(GzDecoder::new(tarball));
            archive.unpack(directory)?;
        } else {
            let dest_dir = dark_destination(directory, file_name);
            fs::create_dir_all(&dest_dir)?;
            info!("moving {file_name} to {}", dest_dir.display());
            fs::rename(&local, dest_dir.join(file_name))?;
        }
    }

    info!(
        "reference files staged; point the simulation data root at {}",
        directory.join("sim_data").display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_instruments_all() {
        let instruments = parse_instruments("all").unwrap();
        assert_eq!(
            instruments,
            vec![Instrument::NirCam, Instrument::NirIss, Instrument::Fgs]
        );
    }

    #[test]
    fn test_parse_instruments_list() {
        let instruments = parse_instruments("NIRCam, fgs").unwrap();
        assert_eq!(instruments, vec![Instrument::NirCam, Instrument::Fgs]);
    }

    #[test]
    fn test_parse_instruments_rejects_unknown() {
        assert!(matches!(
            parse_instruments("nircam,miri"),
            Err(ReferenceDataError::UnknownInstrument(name)) if name == "miri"
        ));
    }

    #[test]
    fn test_file_list_single_instrument() {
        let files = file_list(
            &[Instrument::NirIss],
            PsfLibraryVariant::SubPixel,
            DarkType::Linearized,
        );
        // reffiles + CR library + 16 PSF bundles + 1 linearized dark
        assert_eq!(files.len(), 1 + 1 + NIRISS_SUBPIX_PSF.len() + 1);
        assert!(files
            .iter()
            .any(|(_, name)| *name == "niriss_reference_files.tar.gz"));
        assert!(!files.iter().any(|(_, name)| name.contains("nircam")));
    }

    #[test]
    fn test_file_list_both_darks() {
        let linearized_only = file_list(
            &[Instrument::Fgs],
            PsfLibraryVariant::SubPixel,
            DarkType::Linearized,
        );
        let both = file_list(&[Instrument::Fgs], PsfLibraryVariant::SubPixel, DarkType::Both);
        assert_eq!(both.len(), linearized_only.len() + FGS_RAW_DARKS.len());
    }

    #[test]
    fn test_file_list_gridded_skips_psf_bundles() {
        let files = file_list(
            &[Instrument::NirCam],
            PsfLibraryVariant::Gridded,
            DarkType::Raw,
        );
        assert!(!files.iter().any(|(_, name)| name.contains("webbpsf")));
    }

    #[test]
    fn test_dark_destination_nircam_detector() {
        let dest = dark_destination(
            Path::new("/data"),
            "NRCNRCA1-DARK-60082202011_1_481_SE_2016-01-09T00h03m58_level1b_uncal.fits",
        );
        assert_eq!(dest, Path::new("/data/sim_data/nircam/darks/raw/A1"));
    }

    #[test]
    fn test_dark_destination_long_wavelength_alias() {
        let dest = dark_destination(
            Path::new("/data"),
            "Linearized_Dark_and_SBRefpix_NRCNRCBLONG-DARK-60090141241_1_490_SE_2016-01-09T02h46m50_uncal.fits",
        );
        assert_eq!(dest, Path::new("/data/sim_data/nircam/darks/linearized/B5"));
    }

    #[test]
    fn test_dark_destination_niriss_and_fgs() {
        let niriss = dark_destination(
            Path::new("/data"),
            "NISNIRISSDARK-153451235_11_496_SE_2015-12-11T16h05m20_dms_uncal.fits",
        );
        assert_eq!(niriss, Path::new("/data/sim_data/niriss/darks/raw"));

        let fgs = dark_destination(
            Path::new("/data"),
            "29722_1x88_FGSF03512-D-NR-G2-5339214947_1_498_SE_2015-12-05T22h27m19_dms_uncal_linearized.fits",
        );
        assert_eq!(fgs, Path::new("/data/sim_data/fgs/darks/linearized"));
    }
}
