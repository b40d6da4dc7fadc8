/*!
A parser for an INI file with the following structure:

```ini
[Datapath]
id=0x00000000000000fe

[Description]
manufacturer=Example Networks
hardware=soft switch
software=ofswitch 0.1.0
serial=none
datapath=lab bench datapath

[Table]
max_flows=16384
```

Every section is optional; missing sections fall back to defaults. The
datapath id accepts a hexadecimal value with `0x` prefix or a decimal value.
*/

use openflow::OFP_DEFAULT_MISS_SEND_LEN;

use ini::Ini;

use std::error;
use std::fmt;
use std::io;
use std::num::ParseIntError;

const DATAPATH_SECTION: &str = "Datapath";
const ID_KEY: &str = "id";

const DESC_SECTION: &str = "Description";
const MFR_KEY: &str = "manufacturer";
const HW_KEY: &str = "hardware";
const SW_KEY: &str = "software";
const SERIAL_KEY: &str = "serial";
const DP_KEY: &str = "datapath";

const TABLE_SECTION: &str = "Table";
const MAX_FLOWS_KEY: &str = "max_flows";

/// Default bound on the number of installed flow entries
pub const DEFAULT_MAX_FLOWS: usize = 16384;

#[derive(Debug)]
pub enum Error {
    Io(io::Error),
    Ini(ini::Error),
    ParseDatapathId(String),
    ParseMaxFlows(ParseIntError),
    ZeroMaxFlows,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Io(ref e) => write!(f, "{}", e),
            Error::Ini(ref e) => write!(f, "{}", e),
            Error::ParseDatapathId(ref s) => {
                write!(f, "Error on trying to parse '{}' as datapath id", s)
            }
            Error::ParseMaxFlows(ref e) => {
                write!(f, "Error on trying to parse the flow table bound: {}", e)
            }
            Error::ZeroMaxFlows => write!(f, "The flow table bound must not be zero"),
        }
    }
}

impl error::Error for Error {}

impl From<Error> for io::Error {
    fn from(e: Error) -> Self {
        match e {
            Error::Io(ioe) => ioe,
            _ => io::Error::new(io::ErrorKind::InvalidData, e),
        }
    }
}
impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

/// The switch description strings reported by desc stats
#[derive(Debug, Clone, PartialEq)]
pub struct DescStats {
    pub manufacturer: String,
    pub hardware: String,
    pub software: String,
    pub serial: String,
    pub datapath: String,
}

impl Default for DescStats {
    fn default() -> Self {
        DescStats {
            manufacturer: String::new(),
            hardware: String::new(),
            software: concat!("ofswitch ", env!("CARGO_PKG_VERSION")).to_string(),
            serial: String::new(),
            datapath: String::new(),
        }
    }
}

/// Process-wide switch configuration: the static part loaded from the INI
/// file plus the runtime part the controller sets through SET_CONFIG
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchConfig {
    /// Datapath unique id reported in features replies
    pub dpid: u64,
    /// Description strings for desc stats
    pub desc: DescStats,
    /// Bound on the number of installed flow entries
    pub max_flows: usize,
    /// OFPC fragment handling flags, set by the controller
    pub flags: u16,
    /// Bytes of a missed packet forwarded to the controller
    pub miss_send_len: u16,
    /// True once a SET_CONFIG has been handled
    pub config_set_done: bool,
}

impl Default for SwitchConfig {
    fn default() -> Self {
        SwitchConfig {
            dpid: 0,
            desc: DescStats::default(),
            max_flows: DEFAULT_MAX_FLOWS,
            flags: 0,
            miss_send_len: OFP_DEFAULT_MISS_SEND_LEN,
            config_set_done: false,
        }
    }
}

trait Section {
    type S;

    fn from_ini(conf: &Ini) -> Result<Self::S, Error>;
}

fn parse_dpid(raw: &str) -> Result<u64, Error> {
    let parsed = if raw.starts_with("0x") || raw.starts_with("0X") {
        u64::from_str_radix(&raw[2..], 16)
    } else {
        raw.parse()
    };
    parsed.map_err(|_| Error::ParseDatapathId(raw.to_string()))
}

fn datapath_id(conf: &Ini) -> Result<u64, Error> {
    debug!("Reading [{}] section", DATAPATH_SECTION);

    match conf.section(Some(DATAPATH_SECTION)) {
        Some(section) => match section.get(ID_KEY) {
            Some(raw) => parse_dpid(raw),
            None => Ok(0),
        },
        None => Ok(0),
    }
}

impl Section for DescStats {
    type S = DescStats;

    fn from_ini(conf: &Ini) -> Result<Self::S, Error> {
        debug!("Reading [{}] section", DESC_SECTION);

        let mut desc = DescStats::default();
        if let Some(section) = conf.section(Some(DESC_SECTION)) {
            if let Some(v) = section.get(MFR_KEY) {
                desc.manufacturer = v.to_string();
            }
            if let Some(v) = section.get(HW_KEY) {
                desc.hardware = v.to_string();
            }
            if let Some(v) = section.get(SW_KEY) {
                desc.software = v.to_string();
            }
            if let Some(v) = section.get(SERIAL_KEY) {
                desc.serial = v.to_string();
            }
            if let Some(v) = section.get(DP_KEY) {
                desc.datapath = v.to_string();
            }
        }

        debug!("Got {:?}", desc);
        Ok(desc)
    }
}

fn max_flows(conf: &Ini) -> Result<usize, Error> {
    debug!("Reading [{}] section", TABLE_SECTION);

    let raw = conf
        .section(Some(TABLE_SECTION))
        .and_then(|s| s.get(MAX_FLOWS_KEY));
    match raw {
        Some(raw) => {
            let max: usize = raw.parse().map_err(Error::ParseMaxFlows)?;
            if max == 0 {
                return Err(Error::ZeroMaxFlows);
            }
            Ok(max)
        }
        None => Ok(DEFAULT_MAX_FLOWS),
    }
}

fn from_ini(conf: &Ini) -> Result<SwitchConfig, Error> {
    Ok(SwitchConfig {
        dpid: datapath_id(conf)?,
        desc: DescStats::from_ini(conf)?,
        max_flows: max_flows(conf)?,
        ..SwitchConfig::default()
    })
}

/// Reads the INI file at `path` into a `SwitchConfig`
pub fn parse_file(path: &str) -> Result<SwitchConfig, Error> {
    info!("Reading INI file {}", path);

    let conf = Ini::load_from_file(path).map_err(|e| match e {
        ini::Error::Io(ioe) => Error::Io(ioe),
        other => Error::Ini(other),
    })?;
    from_ini(&conf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(content: &str) -> Result<SwitchConfig, Error> {
        let ini = Ini::load_from_str(content).expect("test ini must parse");
        from_ini(&ini)
    }

    #[test]
    fn empty_file_yields_defaults() {
        let config = load("").unwrap();
        assert_eq!(SwitchConfig::default(), config);
        assert_eq!(DEFAULT_MAX_FLOWS, config.max_flows);
        assert_eq!(OFP_DEFAULT_MISS_SEND_LEN, config.miss_send_len);
        assert!(!config.config_set_done);
    }

    #[test]
    fn hex_datapath_id() {
        let config = load("[Datapath]\nid=0x00000000000000fe\n").unwrap();
        assert_eq!(0xfe, config.dpid);
    }

    #[test]
    fn decimal_datapath_id() {
        let config = load("[Datapath]\nid=42\n").unwrap();
        assert_eq!(42, config.dpid);
    }

    #[test]
    fn invalid_datapath_id() {
        let testee = load("[Datapath]\nid=zz\n");
        match testee {
            Err(Error::ParseDatapathId(ref s)) => assert_eq!("zz", s),
            other => panic!("unexpected result {:?}", other.map(|c| c.dpid)),
        }
    }

    #[test]
    fn description_strings() {
        let config = load(
            "[Description]\nmanufacturer=Example Networks\nhardware=soft switch\nserial=123\n",
        )
        .unwrap();
        assert_eq!("Example Networks", config.desc.manufacturer);
        assert_eq!("soft switch", config.desc.hardware);
        assert_eq!("123", config.desc.serial);
        // unset keys keep their defaults
        assert!(config.desc.software.starts_with("ofswitch"));
    }

    #[test]
    fn table_bound() {
        let config = load("[Table]\nmax_flows=64\n").unwrap();
        assert_eq!(64, config.max_flows);
    }

    #[test]
    fn zero_table_bound_is_rejected() {
        match load("[Table]\nmax_flows=0\n") {
            Err(Error::ZeroMaxFlows) => {}
            other => panic!("unexpected result {:?}", other.map(|c| c.max_flows)),
        }
    }
}
