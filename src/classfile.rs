//! Embedded-version extraction from compiled `ProtocolInfo` classes.
//!
//! A minimal structural decoder over the Java class-file container: constant
//! pool, field/method tables and the `Code` attribute of the static
//! initializer. Nothing is executed. Only four instruction classes are
//! interpreted (load string constant, invoke static, put static field, plus
//! instruction boundaries for everything else); the rest of the stream is
//! walked, not understood.
//!
//! Two strategies, in fixed order, first success wins:
//!
//! 1. the `MINECRAFT_VERSION` field carries a `ConstantValue` string
//!    directly on its declaration;
//! 2. the static initializer loads a string constant, immediately passes it
//!    through `Utils.dynamic(Object)Object` and immediately stores the
//!    result into `MINECRAFT_VERSION`. Any interposed instruction, or any
//!    deviation in owner, name, descriptor or field target, drops the
//!    tracked candidate; tracking only restarts at a later string-constant
//!    load.
//!
//! A leading `v` (lowercase only) is stripped from the recovered value.

use anyhow::{Context, Result, bail};

use crate::error::AggregatorError;

pub const PROTOCOL_INFO_CLASS: &str = "cn/nukkit/network/protocol/ProtocolInfo";
pub const MINECRAFT_VERSION_FIELD: &str = "MINECRAFT_VERSION";

const STRING_DESCRIPTOR: &str = "Ljava/lang/String;";
const WRAPPER_OWNER: &str = "cn/nukkit/utils/Utils";
const WRAPPER_NAME: &str = "dynamic";
const WRAPPER_DESCRIPTOR: &str = "(Ljava/lang/Object;)Ljava/lang/Object;";

const OP_LDC: u8 = 0x12;
const OP_LDC_W: u8 = 0x13;
const OP_IINC: u8 = 0x84;
const OP_TABLESWITCH: u8 = 0xaa;
const OP_LOOKUPSWITCH: u8 = 0xab;
const OP_PUTSTATIC: u8 = 0xb3;
const OP_INVOKESTATIC: u8 = 0xb8;
const OP_WIDE: u8 = 0xc4;

/// Recovers the embedded Minecraft version token from raw class bytes.
pub fn extract_embedded_version(class_bytes: &[u8]) -> Result<String> {
    let class = ClassFile::parse(class_bytes)?;
    if let Some(value) = direct_constant(&class) {
        return Ok(value);
    }
    if let Some(value) = initializer_constant(&class)? {
        return Ok(value);
    }
    Err(AggregatorError::Extraction {
        class_name: PROTOCOL_INFO_CLASS.to_string(),
        field_name: MINECRAFT_VERSION_FIELD.to_string(),
    }
    .into())
}

fn strip_v(value: &str) -> String {
    value.strip_prefix('v').unwrap_or(value).to_string()
}

#[derive(Debug)]
enum Constant {
    Utf8(String),
    Class { name: u16 },
    Str { utf8: u16 },
    FieldRef { class: u16, name_and_type: u16 },
    MethodRef { class: u16, name_and_type: u16 },
    NameAndType { name: u16, descriptor: u16 },
    // Numeric entries, interface method refs, method handles and the like.
    // They only need to occupy their pool slots.
    Other,
}

#[derive(Debug)]
struct Attribute {
    name: String,
    data: Vec<u8>,
}

#[derive(Debug)]
struct Member {
    name: String,
    descriptor: String,
    attributes: Vec<Attribute>,
}

#[derive(Debug)]
struct ClassFile {
    pool: Vec<Constant>,
    fields: Vec<Member>,
    methods: Vec<Member>,
}

impl ClassFile {
    fn parse(bytes: &[u8]) -> Result<Self> {
        let mut reader = Reader::new(bytes);
        if reader.u32()? != 0xCAFE_BABE {
            bail!("not a class file (bad magic)");
        }
        reader.skip(4)?; // minor, major
        let pool = parse_pool(&mut reader)?;
        reader.skip(6)?; // access flags, this, super
        let interfaces = reader.u16()? as usize;
        reader.skip(interfaces * 2)?;
        let fields = parse_members(&mut reader, &pool)?;
        let methods = parse_members(&mut reader, &pool)?;
        Ok(Self {
            pool,
            fields,
            methods,
        })
    }

    fn utf8(&self, index: u16) -> Option<&str> {
        match self.pool.get(index as usize)? {
            Constant::Utf8(text) => Some(text),
            _ => None,
        }
    }

    fn string_constant(&self, index: u16) -> Option<&str> {
        match self.pool.get(index as usize)? {
            Constant::Str { utf8 } => self.utf8(*utf8),
            _ => None,
        }
    }

    fn class_name(&self, index: u16) -> Option<&str> {
        match self.pool.get(index as usize)? {
            Constant::Class { name } => self.utf8(*name),
            _ => None,
        }
    }

    fn name_and_type(&self, index: u16) -> Option<(&str, &str)> {
        match self.pool.get(index as usize)? {
            Constant::NameAndType { name, descriptor } => {
                Some((self.utf8(*name)?, self.utf8(*descriptor)?))
            }
            _ => None,
        }
    }

    /// Resolves a `Methodref` (never an interface method ref) to
    /// (owner, name, descriptor).
    fn method_ref(&self, index: u16) -> Option<(&str, &str, &str)> {
        match self.pool.get(index as usize)? {
            Constant::MethodRef {
                class,
                name_and_type,
            } => {
                let owner = self.class_name(*class)?;
                let (name, descriptor) = self.name_and_type(*name_and_type)?;
                Some((owner, name, descriptor))
            }
            _ => None,
        }
    }

    fn field_ref(&self, index: u16) -> Option<(&str, &str, &str)> {
        match self.pool.get(index as usize)? {
            Constant::FieldRef {
                class,
                name_and_type,
            } => {
                let owner = self.class_name(*class)?;
                let (name, descriptor) = self.name_and_type(*name_and_type)?;
                Some((owner, name, descriptor))
            }
            _ => None,
        }
    }
}

fn parse_pool(reader: &mut Reader<'_>) -> Result<Vec<Constant>> {
    let count = reader.u16()? as usize;
    let mut pool = Vec::with_capacity(count);
    pool.push(Constant::Other); // slot 0 is unused
    while pool.len() < count {
        let tag = reader.u8()?;
        match tag {
            1 => {
                let length = reader.u16()? as usize;
                let bytes = reader.take(length)?;
                // Modified UTF-8; the identifiers and version constants we
                // resolve are plain ASCII, so a lossy decode is sufficient.
                pool.push(Constant::Utf8(String::from_utf8_lossy(bytes).into_owned()));
            }
            3 | 4 => {
                reader.skip(4)?;
                pool.push(Constant::Other);
            }
            5 | 6 => {
                // Longs and doubles take two pool slots.
                reader.skip(8)?;
                pool.push(Constant::Other);
                pool.push(Constant::Other);
            }
            7 => {
                let name = reader.u16()?;
                pool.push(Constant::Class { name });
            }
            8 => {
                let utf8 = reader.u16()?;
                pool.push(Constant::Str { utf8 });
            }
            9 => {
                let class = reader.u16()?;
                let name_and_type = reader.u16()?;
                pool.push(Constant::FieldRef {
                    class,
                    name_and_type,
                });
            }
            10 => {
                let class = reader.u16()?;
                let name_and_type = reader.u16()?;
                pool.push(Constant::MethodRef {
                    class,
                    name_and_type,
                });
            }
            11 | 17 | 18 => {
                reader.skip(4)?;
                pool.push(Constant::Other);
            }
            12 => {
                let name = reader.u16()?;
                let descriptor = reader.u16()?;
                pool.push(Constant::NameAndType { name, descriptor });
            }
            15 => {
                reader.skip(3)?;
                pool.push(Constant::Other);
            }
            16 | 19 | 20 => {
                reader.skip(2)?;
                pool.push(Constant::Other);
            }
            other => bail!("unsupported constant pool tag {other}"),
        }
    }
    Ok(pool)
}

fn parse_members(reader: &mut Reader<'_>, pool: &[Constant]) -> Result<Vec<Member>> {
    let count = reader.u16()?;
    let mut members = Vec::with_capacity(count as usize);
    for _ in 0..count {
        reader.skip(2)?; // access flags
        let name = pool_utf8(pool, reader.u16()?)?.to_string();
        let descriptor = pool_utf8(pool, reader.u16()?)?.to_string();
        let attributes = parse_attributes(reader, pool)?;
        members.push(Member {
            name,
            descriptor,
            attributes,
        });
    }
    Ok(members)
}

fn parse_attributes(reader: &mut Reader<'_>, pool: &[Constant]) -> Result<Vec<Attribute>> {
    let count = reader.u16()?;
    let mut attributes = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let name = pool_utf8(pool, reader.u16()?)?.to_string();
        let length = reader.u32()? as usize;
        let data = reader.take(length)?.to_vec();
        attributes.push(Attribute { name, data });
    }
    Ok(attributes)
}

fn pool_utf8(pool: &[Constant], index: u16) -> Result<&str> {
    match pool.get(index as usize) {
        Some(Constant::Utf8(text)) => Ok(text),
        _ => bail!("constant pool index {index} is not a utf8 entry"),
    }
}

/// Strategy 1: a literal string default attached to the field declaration.
fn direct_constant(class: &ClassFile) -> Option<String> {
    let field = class.fields.iter().find(|f| {
        f.name == MINECRAFT_VERSION_FIELD
            && f.descriptor == STRING_DESCRIPTOR
            && !f.attributes.iter().any(|a| a.name == "Signature")
    })?;
    let attribute = field.attributes.iter().find(|a| a.name == "ConstantValue")?;
    let index = u16::from_be_bytes([*attribute.data.first()?, *attribute.data.get(1)?]);
    Some(strip_v(class.string_constant(index)?))
}

/// Strategy 2: the ldc / invokestatic wrapper / putstatic triple inside
/// `<clinit>`.
fn initializer_constant(class: &ClassFile) -> Result<Option<String>> {
    let Some(clinit) = class
        .methods
        .iter()
        .find(|m| m.name == "<clinit>" && m.descriptor == "()V")
    else {
        return Ok(None);
    };
    let Some(code_attribute) = clinit.attributes.iter().find(|a| a.name == "Code") else {
        return Ok(None);
    };
    let mut reader = Reader::new(&code_attribute.data);
    reader.skip(4)?; // max_stack, max_locals
    let code_length = reader.u32()? as usize;
    let code = reader.take(code_length)?;
    scan_initializer(class, code)
}

#[derive(Debug, Default)]
enum Scan {
    #[default]
    Idle,
    Loaded(String),
    Invoked(String),
}

fn scan_initializer(class: &ClassFile, code: &[u8]) -> Result<Option<String>> {
    let mut state = Scan::Idle;
    let mut pc = 0usize;
    while pc < code.len() {
        let op = code[pc];
        let width = instruction_width(code, pc)?;
        state = match op {
            OP_LDC | OP_LDC_W => {
                let index = if op == OP_LDC {
                    u16::from(read_u8(code, pc + 1)?)
                } else {
                    read_u16(code, pc + 1)?
                };
                match (state, class.string_constant(index)) {
                    // A fresh candidate may only begin outside an active
                    // window; a load inside one invalidates it instead.
                    (Scan::Idle, Some(text)) => Scan::Loaded(text.to_string()),
                    _ => Scan::Idle,
                }
            }
            OP_INVOKESTATIC => {
                let index = read_u16(code, pc + 1)?;
                match state {
                    Scan::Loaded(text)
                        if class.method_ref(index)
                            == Some((WRAPPER_OWNER, WRAPPER_NAME, WRAPPER_DESCRIPTOR)) =>
                    {
                        Scan::Invoked(text)
                    }
                    _ => Scan::Idle,
                }
            }
            OP_PUTSTATIC => {
                let index = read_u16(code, pc + 1)?;
                match state {
                    Scan::Invoked(text)
                        if class.field_ref(index)
                            == Some((
                                PROTOCOL_INFO_CLASS,
                                MINECRAFT_VERSION_FIELD,
                                STRING_DESCRIPTOR,
                            )) =>
                    {
                        return Ok(Some(strip_v(&text)));
                    }
                    _ => Scan::Idle,
                }
            }
            _ => Scan::Idle,
        };
        pc += width;
    }
    Ok(None)
}

/// Byte width of the instruction at `pc`, including operands.
fn instruction_width(code: &[u8], pc: usize) -> Result<usize> {
    let op = code[pc];
    let width = match op {
        0x10 | OP_LDC | 0x15..=0x19 | 0x36..=0x3a | 0xa9 | 0xbc => 2,
        0x11 | OP_LDC_W | 0x14 | OP_IINC | 0x99..=0xa8 | 0xb2..=0xb8 | 0xbb | 0xbd | 0xc0
        | 0xc1 | 0xc6 | 0xc7 => 3,
        0xc5 => 4,
        0xb9 | 0xba | 0xc8 | 0xc9 => 5,
        OP_WIDE => {
            if code.get(pc + 1) == Some(&OP_IINC) {
                6
            } else {
                4
            }
        }
        OP_TABLESWITCH => {
            let base = pc + 1 + pad_to_4(pc + 1);
            let low = i64::from(read_i32(code, base + 4)?);
            let high = i64::from(read_i32(code, base + 8)?);
            if high < low {
                bail!("malformed tableswitch");
            }
            base + 12 + (high - low + 1) as usize * 4 - pc
        }
        OP_LOOKUPSWITCH => {
            let base = pc + 1 + pad_to_4(pc + 1);
            let npairs = read_i32(code, base + 4)?;
            if npairs < 0 {
                bail!("malformed lookupswitch");
            }
            base + 8 + npairs as usize * 8 - pc
        }
        _ => 1,
    };
    Ok(width)
}

fn pad_to_4(offset: usize) -> usize {
    (4 - offset % 4) % 4
}

fn read_u8(code: &[u8], offset: usize) -> Result<u8> {
    code.get(offset)
        .copied()
        .context("truncated instruction stream")
}

fn read_u16(code: &[u8], offset: usize) -> Result<u16> {
    Ok(u16::from_be_bytes([
        read_u8(code, offset)?,
        read_u8(code, offset + 1)?,
    ]))
}

fn read_i32(code: &[u8], offset: usize) -> Result<i32> {
    Ok(i32::from_be_bytes([
        read_u8(code, offset)?,
        read_u8(code, offset + 1)?,
        read_u8(code, offset + 2)?,
        read_u8(code, offset + 3)?,
    ]))
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, count: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(count)
            .filter(|end| *end <= self.bytes.len())
            .context("truncated class file")?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn skip(&mut self, count: usize) -> Result<()> {
        self.take(count).map(|_| ())
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16> {
        let bytes = self.take(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    fn u32(&mut self) -> Result<u32> {
        let bytes = self.take(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }
}
