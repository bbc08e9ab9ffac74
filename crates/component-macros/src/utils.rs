//! 宏工具函数

use syn::{Field, GenericArgument, PathArguments, Type};

/// 从 `Arc<T>` 中提取 `T`
pub fn extract_arc_inner(ty: &Type) -> Option<&Type> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    let segment = type_path.path.segments.last()?;
    if segment.ident != "Arc" {
        return None;
    }
    match &segment.arguments {
        PathArguments::AngleBracketed(args) => match args.args.first() {
            Some(GenericArgument::Type(inner)) => Some(inner),
            _ => None,
        },
        _ => None,
    }
}

/// 检查字段是否有特定属性
pub fn field_has_attribute(field: &Field, attr_name: &str) -> bool {
    field.attrs.iter().any(|attr| attr.path().is_ident(attr_name))
}

/// 把 `find_all` 之类的方法名转换成字符串列表
pub fn method_name_literals(methods: &[syn::Ident]) -> Vec<String> {
    methods.iter().map(ToString::to_string).collect()
}
