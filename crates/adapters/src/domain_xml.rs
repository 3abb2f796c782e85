// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Synthesizes the libvirt domain XML for one VM: qcow2 disk, cdrom config
//! medium, one filtered NIC, one VNC graphics device.

use crate::hypervisor::DomainSpec;

/// Re-exported alias so callers don't need to depend on [`DomainSpec`]
/// directly for just building XML.
pub type DomainXmlSpec = DomainSpec;

pub fn build_domain_xml(spec: &DomainXmlSpec) -> String {
    let filter_xml = match &spec.filter_name {
        Some(name) => format!("<filterref filter='{}'/>", xml_escape(name)),
        None => String::new(),
    };

    format!(
        r#"<domain type='kvm'>
  <name>{name}</name>
  <memory unit='MiB'>{memory_mb}</memory>
  <vcpu>{vcpus}</vcpu>
  <os>
    <type arch='x86_64'>hvm</type>
    <boot dev='hd'/>
  </os>
  <devices>
    <disk type='file' device='disk'>
      <driver name='qemu' type='qcow2'/>
      <source file='{disk_path}'/>
      <target dev='vda' bus='virtio'/>
    </disk>
    <disk type='file' device='cdrom'>
      <driver name='qemu' type='raw'/>
      <source file='{cdrom_path}'/>
      <target dev='sda' bus='sata'/>
      <readonly/>
    </disk>
    <interface type='network'>
      <mac address='{mac_address}'/>
      <source network='{network_name}'/>
      {filter_xml}
    </interface>
    <graphics type='vnc' port='{vnc_port}' autoport='no' listen='127.0.0.1'/>
  </devices>
</domain>
"#,
        name = xml_escape(&spec.name),
        memory_mb = spec.memory_mb,
        vcpus = spec.vcpus,
        disk_path = xml_escape(&spec.disk_path),
        cdrom_path = xml_escape(&spec.cdrom_path),
        mac_address = xml_escape(&spec.mac_address),
        network_name = xml_escape(&spec.network_name),
        filter_xml = filter_xml,
        vnc_port = spec.vnc_port,
    )
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;").replace('"', "&quot;")
}
