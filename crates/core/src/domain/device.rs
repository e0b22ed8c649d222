// Device Profile - configuration data describing the hardware to sample
//
// The card/NPU enumeration is configuration, not logic: a profile expands
// into the command tables the collector runs. Any platform diagnostic can be
// expressed this way; the defaults target a distributed NPU-based router.

use serde::{Deserialize, Serialize};

use crate::domain::command::{CommandSpec, CommandTable};
use crate::domain::error::{DomainError, Result};
use crate::domain::snapshot::Snapshot;

/// Hardware profile of the sampled device.
///
/// `cards` is the number of line-card slots to iterate; nonexistent
/// card/NPU combinations are harmless because the per-NPU diagnostic
/// binaries simply do not exist on the missing hardware and are skipped
/// at spawn time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceProfile {
    pub cards: u8,
    pub npus_per_card: u8,
    /// Interface whose policy-map statistics are sampled
    pub interface: String,
}

impl Default for DeviceProfile {
    fn default() -> Self {
        Self {
            cards: 18,
            npus_per_card: 4,
            interface: "Bundle-Ether21".to_string(),
        }
    }
}

impl DeviceProfile {
    /// Create a profile.
    ///
    /// # Errors
    /// - `DomainError::ValidationError` if the interface name is empty
    pub fn new(cards: u8, npus_per_card: u8, interface: impl Into<String>) -> Result<Self> {
        let interface = interface.into();
        if interface.trim().is_empty() {
            return Err(DomainError::ValidationError(
                "interface name must not be empty".to_string(),
            ));
        }
        Ok(Self {
            cards,
            npus_per_card,
            interface,
        })
    }

    /// Build the table of show commands run on every sampling round.
    ///
    /// Base commands first, then one drop-counter query per (card, NPU)
    /// pair. The per-NPU node id is `256 * card`.
    pub fn show_table(&self) -> Result<CommandTable> {
        let mut table = CommandTable::new();

        table.insert(CommandSpec::new(Snapshot::TIMESTAMP_KEY, "date", ["+%s"]))?;
        table.insert(CommandSpec::new(
            "showVersion",
            "show_version",
            Vec::<String>::new(),
        ))?;
        table.insert(CommandSpec::new("showIntf", "show_interface", ["-a"]))?;
        table.insert(CommandSpec::new("showInv", "show_inventory", ["-e"]))?;
        table.insert(CommandSpec::new(
            Snapshot::HOSTNAME_KEY,
            "cat",
            ["/etc/hostname"],
        ))?;
        table.insert(CommandSpec::new(
            "showNpuSlice",
            "show_slicemgr",
            ["-I", "0xff", "-n", "A"],
        ))?;
        table.insert(CommandSpec::new(
            "showPolMapInt",
            "qos_ma_show_stats",
            ["-i", self.interface.as_str(), "-p", "0x1", "-q", "0x2"],
        ))?;

        for (card, npu) in self.npu_instances() {
            let instance = format!("0x{npu}");
            let node_id = (256 * card as u32).to_string();
            table.insert(CommandSpec::new(
                format!("npu_drops{card}_{npu}"),
                "ofa_npu_stats_show",
                [
                    "-v",
                    "a",
                    "-t",
                    "e",
                    "-p",
                    "0xffffffff",
                    "-s",
                    "0x0",
                    "-d",
                    "A",
                    "-i",
                    instance.as_str(),
                    "-n",
                    node_id.as_str(),
                ],
            ))?;
        }

        Ok(table)
    }

    /// Build the table of counter-reset commands, run once at startup so
    /// that later snapshots show deltas accumulated during the session.
    pub fn clear_table(&self) -> Result<CommandTable> {
        let mut table = CommandTable::new();
        for (card, npu) in self.npu_instances() {
            let instance = format!("0x{npu}");
            let node_id = (256 * card as u32).to_string();
            table.insert(CommandSpec::new(
                format!("clear_command_{card}_{npu}"),
                "npd_npu_driver_clear",
                ["-c", "s", "-i", instance.as_str(), "-n", node_id.as_str()],
            ))?;
        }
        Ok(table)
    }

    fn npu_instances(&self) -> impl Iterator<Item = (u8, u8)> {
        let npus = self.npus_per_card;
        (0..self.cards).flat_map(move |card| (0..npus).map(move |npu| (card, npu)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE_COMMANDS: usize = 7;

    #[test]
    fn test_show_table_size() {
        let profile = DeviceProfile::default();
        let table = profile.show_table().unwrap();
        assert_eq!(table.len(), BASE_COMMANDS + 18 * 4);
    }

    #[test]
    fn test_clear_table_size() {
        let profile = DeviceProfile::new(2, 3, "Bundle-Ether21").unwrap();
        let table = profile.clear_table().unwrap();
        assert_eq!(table.len(), 2 * 3);
        assert!(table.get("clear_command_1_2").is_some());
    }

    #[test]
    fn test_fixed_system_has_only_base_commands() {
        let profile = DeviceProfile::new(0, 0, "HundredGigE0/0/0/0").unwrap();
        assert_eq!(profile.show_table().unwrap().len(), BASE_COMMANDS);
        assert!(profile.clear_table().unwrap().is_empty());
    }

    #[test]
    fn test_npu_drop_query_addressing() {
        let profile = DeviceProfile::default();
        let table = profile.show_table().unwrap();

        let spec = table.get("npu_drops2_3").unwrap();
        assert_eq!(spec.program, "ofa_npu_stats_show");
        // instance is hex, node id is 256 * card
        let args = &spec.args;
        let i_pos = args.iter().position(|a| a == "-i").unwrap();
        assert_eq!(args[i_pos + 1], "0x3");
        let n_pos = args.iter().position(|a| a == "-n").unwrap();
        assert_eq!(args[n_pos + 1], "512");
    }

    #[test]
    fn test_interface_flows_into_policy_map_query() {
        let profile = DeviceProfile::new(1, 1, "Bundle-Ether42").unwrap();
        let table = profile.show_table().unwrap();
        let spec = table.get("showPolMapInt").unwrap();
        assert!(spec.args.contains(&"Bundle-Ether42".to_string()));
    }

    #[test]
    fn test_empty_interface_rejected() {
        let err = DeviceProfile::new(1, 1, "  ").unwrap_err();
        assert!(matches!(err, DomainError::ValidationError(_)));
    }
}
