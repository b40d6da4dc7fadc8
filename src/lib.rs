/*!
The state-management core of an OpenFlow 1.0-1.3 software switch agent.

The crate sits between a controller connection layer and the local datapath.
It accepts decoded controller messages together with a connection id,
maintains the switch's authoritative flow table, dispatches operations to the
forwarding and port subsystems and produces replies and asynchronous
notifications.

The connection layer, the byte-level wire codec and the datapath itself are
collaborators reached through the traits in [`switch::datapath`]; this crate
defines the decoded message model those collaborators exchange.

A minimal embedding looks like this:

```no_run
use ofswitch::switch::OfSwitch;

let config = ofswitch::conf::parse_file("/etc/ofswitch.ini").unwrap();
let switch = OfSwitch::new(config);
// hand decoded messages to switch.handle_message(..) and give the
// iteration tasks a turn with switch.run_tasks(..) from the event loop
# drop(switch);
```
*/

#[macro_use]
extern crate log;
extern crate byteorder;
extern crate ini;
extern crate ipnetwork;

pub mod conf;
pub mod openflow;
pub mod switch;
