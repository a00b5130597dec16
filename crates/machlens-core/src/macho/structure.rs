//! Header and load command tree.

use super::strings::{
    cpu_subtype_string, cpu_type_string, file_flags_string, file_type_string, load_command_name, load_command_string,
    magic_string, section_flags_string, segment_flags_string, version_string, vmprot_string,
};
use super::{LoadCommand, MachFile, Section, SegmentCommand};

/// A labelled value with optional children
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructNode
{
    pub label: String,
    /// May span several lines for flag sets
    pub value: String,
    pub children: Vec<StructNode>,
}

impl StructNode
{
    fn leaf(label: &str, value: impl Into<String>) -> Self
    {
        Self {
            label: label.to_string(),
            value: value.into(),
            children: Vec::new(),
        }
    }

    fn branch(label: impl Into<String>, children: Vec<StructNode>) -> Self
    {
        Self {
            label: label.into(),
            value: String::new(),
            children,
        }
    }

    /// Child by label.
    pub fn child(&self, label: &str) -> Option<&StructNode>
    {
        self.children.iter().find(|node| node.label == label)
    }
}

/// `Header` followed by one node per load command.
pub fn structure(file: &MachFile) -> Vec<StructNode>
{
    let header = &file.header;
    let mut nodes = vec![StructNode::branch(
        "Header",
        vec![
            StructNode::leaf("magic", magic_string(header.magic)),
            StructNode::leaf("cputype", cpu_type_string(header.cputype)),
            StructNode::leaf("cpusubtype", cpu_subtype_string(header.cputype, header.cpusubtype)),
            StructNode::leaf("filetype", file_type_string(header.filetype)),
            StructNode::leaf("ncmds", header.ncmds.to_string()),
            StructNode::leaf("sizeofcmds", header.sizeofcmds.to_string()),
            StructNode::leaf("flags", file_flags_string(header.flags)),
        ],
    )];

    for (i, command) in file.load_commands.iter().enumerate() {
        let mut children = vec![
            StructNode::leaf("cmd", load_command_string(command.cmd())),
            StructNode::leaf("cmdsize", command.cmdsize().to_string()),
        ];
        match command {
            LoadCommand::Segment(segment) => segment_nodes(file, segment, &mut children),
            LoadCommand::Symtab(symtab) => children.extend([
                StructNode::leaf("symoff", symtab.symoff.to_string()),
                StructNode::leaf("nsyms", symtab.nsyms.to_string()),
                StructNode::leaf("stroff", symtab.stroff.to_string()),
                StructNode::leaf("strsize", symtab.strsize.to_string()),
            ]),
            LoadCommand::Dysymtab(dysymtab) => children.extend(
                [
                    ("ilocalsym", dysymtab.ilocalsym),
                    ("nlocalsym", dysymtab.nlocalsym),
                    ("iextdefsym", dysymtab.iextdefsym),
                    ("nextdefsym", dysymtab.nextdefsym),
                    ("iundefsym", dysymtab.iundefsym),
                    ("nundefsym", dysymtab.nundefsym),
                    ("tocoff", dysymtab.tocoff),
                    ("ntoc", dysymtab.ntoc),
                    ("modtaboff", dysymtab.modtaboff),
                    ("nmodtab", dysymtab.nmodtab),
                    ("extrefsymoff", dysymtab.extrefsymoff),
                    ("nextrefsyms", dysymtab.nextrefsyms),
                    ("indirectsymoff", dysymtab.indirectsymoff),
                    ("nindirectsyms", dysymtab.nindirectsyms),
                    ("extreloff", dysymtab.extreloff),
                    ("nextrel", dysymtab.nextrel),
                    ("locreloff", dysymtab.locreloff),
                    ("nlocrel", dysymtab.nlocrel),
                ]
                .into_iter()
                .map(|(label, value)| StructNode::leaf(label, value.to_string())),
            ),
            LoadCommand::Dylib(dylib) => children.extend([
                StructNode::leaf("name", dylib.name.clone()),
                StructNode::leaf("timestamp", dylib.timestamp.to_string()),
                StructNode::leaf("current_version", version_string(dylib.current_version)),
                StructNode::leaf("compatibility_version", version_string(dylib.compatibility_version)),
            ]),
            LoadCommand::Rpath(rpath) => children.push(StructNode::leaf("path", rpath.path.clone())),
            LoadCommand::Other { .. } => {}
        }
        nodes.push(StructNode::branch(
            format!("Load Command {i} ({})", load_command_name(command.cmd())),
            children,
        ));
    }
    nodes
}

fn segment_nodes(file: &MachFile, segment: &SegmentCommand, children: &mut Vec<StructNode>)
{
    children.extend([
        StructNode::leaf("segname", segment.name.clone()),
        StructNode::leaf("vmaddr", format!("{:#018x}", segment.vmaddr)),
        StructNode::leaf("vmsize", format!("{:#x}", segment.vmsize)),
        StructNode::leaf("fileoff", segment.fileoff.to_string()),
        StructNode::leaf("filesize", segment.filesize.to_string()),
        StructNode::leaf("maxprot", vmprot_string(segment.maxprot)),
        StructNode::leaf("initprot", vmprot_string(segment.initprot)),
        StructNode::leaf("nsects", segment.nsects.to_string()),
        StructNode::leaf("flags", segment_flags_string(segment.flags)),
    ]);
    for &number in &segment.sections {
        if let Some(section) = file.sections.get(number.wrapping_sub(1)) {
            children.push(section_node(section));
        }
    }
}

fn section_node(section: &Section) -> StructNode
{
    StructNode::branch(
        format!("Section {} ({})", section.index, section.label()),
        vec![
            StructNode::leaf("sectname", section.name.clone()),
            StructNode::leaf("segname", section.segment_name.clone()),
            StructNode::leaf("addr", format!("{:#018x}", section.addr)),
            StructNode::leaf("size", format!("{:#x}", section.size)),
            StructNode::leaf("offset", section.offset.to_string()),
            StructNode::leaf("align", format!("{} ({})", section.align, 1u64 << section.align.min(63))),
            StructNode::leaf("reloff", section.reloff.to_string()),
            StructNode::leaf("nreloc", section.nreloc.to_string()),
            StructNode::leaf("flags", section_flags_string(section.flags)),
        ],
    )
}

#[cfg(test)]
mod tests
{
    use gimli::RunTimeEndian;

    use super::*;
    use crate::macho::constants::{CPU_TYPE_ARM64, LC_RPATH, MH_OBJECT};
    use crate::macho::RpathCommand;

    #[test]
    fn test_structure_header_and_rpath()
    {
        let mut file = MachFile::from_parts(CPU_TYPE_ARM64, MH_OBJECT, RunTimeEndian::Little, Vec::new(), Vec::new());
        file.load_commands.push(LoadCommand::Rpath(RpathCommand {
            cmd: LC_RPATH,
            cmdsize: 32,
            path: "@loader_path/../lib".into(),
        }));

        let nodes = structure(&file);
        assert_eq!(nodes.len(), 2);
        let header = &nodes[0];
        assert_eq!(header.label, "Header");
        assert!(header.child("cputype").is_some_and(|node| node.value.contains("CPU_TYPE_ARM64")));
        assert_eq!(nodes[1].label, "Load Command 0 (LC_RPATH)");
        assert_eq!(
            nodes[1].child("path").map(|node| node.value.as_str()),
            Some("@loader_path/../lib")
        );
    }
}
