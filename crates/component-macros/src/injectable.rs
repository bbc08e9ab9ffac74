//! 可注入类型派生宏实现

use crate::utils::{extract_arc_inner, field_has_attribute, method_name_literals};
use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{quote, ToTokens};
use syn::{
    punctuated::Punctuated, spanned::Spanned, Attribute, Data, DeriveInput, Error, Expr, Field,
    Fields, Ident, Lit, Meta, Result, Token,
};

/// 实例作用域
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScopeArg {
    Default,
    Transient,
    Request,
}

impl ScopeArg {
    fn parse(value: &str, span: proc_macro2::Span) -> Result<Self> {
        match value {
            "default" | "singleton" => Ok(Self::Default),
            "transient" => Ok(Self::Transient),
            "request" => Ok(Self::Request),
            other => Err(Error::new(span, format!("未知的作用域: {}", other))),
        }
    }
}

impl ToTokens for ScopeArg {
    fn to_tokens(&self, tokens: &mut TokenStream2) {
        let variant = match self {
            Self::Default => quote! { Default },
            Self::Transient => quote! { Transient },
            Self::Request => quote! { Request },
        };
        tokens.extend(quote! { ::di_abstractions::__private::Scope::#variant });
    }
}

/// `#[injectable(...)]` 参数
#[derive(Debug, Default)]
struct InjectableArgs {
    scope: Option<ScopeArg>,
    methods: Vec<Ident>,
}

impl InjectableArgs {
    fn from_attributes(attrs: &[Attribute]) -> Result<Self> {
        let mut args = Self::default();
        for attr in attrs.iter().filter(|attr| attr.path().is_ident("injectable")) {
            let parsed = attr.parse_args_with(Punctuated::<Meta, Token![,]>::parse_terminated)?;
            for meta in parsed {
                match meta {
                    Meta::Path(path) => {
                        let name = path
                            .get_ident()
                            .map(ToString::to_string)
                            .unwrap_or_default();
                        args.scope = Some(ScopeArg::parse(&name, path.span())?);
                    }
                    Meta::NameValue(nv) if nv.path.is_ident("scope") => match nv.value {
                        Expr::Lit(expr) => match expr.lit {
                            Lit::Str(lit) => {
                                args.scope = Some(ScopeArg::parse(&lit.value(), lit.span())?);
                            }
                            other => return Err(Error::new(other.span(), "scope 必须是字符串")),
                        },
                        other => return Err(Error::new(other.span(), "scope 必须是字符串")),
                    },
                    Meta::List(list) if list.path.is_ident("methods") => {
                        let methods =
                            list.parse_args_with(Punctuated::<Ident, Token![,]>::parse_terminated)?;
                        args.methods.extend(methods);
                    }
                    other => return Err(Error::new(other.span(), "不支持的 injectable 参数")),
                }
            }
        }
        Ok(args)
    }
}

/// 注入字段
enum FieldInit {
    /// 按令牌注入
    Inject(TokenStream2),
    /// 使用 `Default::default()`
    Default,
}

fn field_init(field: &Field) -> Result<FieldInit> {
    if !field_has_attribute(field, "inject") {
        return Ok(FieldInit::Default);
    }
    let inner = extract_arc_inner(&field.ty)
        .ok_or_else(|| Error::new(field.ty.span(), "#[inject] 字段必须是 Arc<T>"))?;

    let mut token = quote! { ::di_abstractions::__private::Token::of::<#inner>() };
    for attr in field.attrs.iter().filter(|attr| attr.path().is_ident("inject")) {
        if let Meta::List(_) = attr.meta {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("token") {
                    let name: syn::LitStr = meta.value()?.parse()?;
                    token = quote! { ::di_abstractions::__private::Token::name(#name) };
                    Ok(())
                } else if meta.path.is_ident("type") {
                    let ty: syn::Type = meta.value()?.parse()?;
                    token = quote! { ::di_abstractions::__private::Token::of::<#ty>() };
                    Ok(())
                } else {
                    Err(meta.error("不支持的 inject 参数"))
                }
            })?;
        }
    }
    Ok(FieldInit::Inject(token))
}

/// 实现 #[derive(Injectable)] 宏
pub fn derive_injectable_impl(input: DeriveInput) -> TokenStream {
    match expand(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(input: &DeriveInput) -> Result<TokenStream2> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let args = InjectableArgs::from_attributes(&input.attrs)?;

    let Data::Struct(data) = &input.data else {
        return Err(Error::new(input.span(), "Injectable 只能用于结构体"));
    };

    let mut tokens = Vec::new();
    let body = match &data.fields {
        Fields::Named(fields) => {
            let mut inits = Vec::new();
            for field in &fields.named {
                let ident = &field.ident;
                match field_init(field)? {
                    FieldInit::Inject(token) => {
                        tokens.push(token);
                        inits.push(quote! { #ident: deps.take()? });
                    }
                    FieldInit::Default => {
                        inits.push(quote! { #ident: ::core::default::Default::default() });
                    }
                }
            }
            quote! { Self { #(#inits),* } }
        }
        Fields::Unnamed(fields) => {
            let mut inits = Vec::new();
            for field in &fields.unnamed {
                match field_init(field)? {
                    FieldInit::Inject(token) => {
                        tokens.push(token);
                        inits.push(quote! { deps.take()? });
                    }
                    FieldInit::Default => {
                        inits.push(quote! { ::core::default::Default::default() });
                    }
                }
            }
            quote! { Self(#(#inits),*) }
        }
        Fields::Unit => quote! { Self },
    };

    let deps_binding = if tokens.is_empty() {
        quote! { _deps }
    } else {
        quote! { mut deps }
    };

    let scope_fn = args.scope.map(|scope| {
        quote! {
            fn scope() -> ::di_abstractions::__private::Scope {
                #scope
            }
        }
    });

    let declare_fn = (!args.methods.is_empty()).then(|| {
        let methods = method_name_literals(&args.methods);
        quote! {
            fn declare_metadata(store: &::di_abstractions::__private::MetadataStore) {
                ::di_abstractions::MetadataStoreExt::define_methods::<Self>(store, &[#(#methods),*]);
            }
        }
    });

    Ok(quote! {
        impl #impl_generics ::di_abstractions::Injectable for #name #ty_generics #where_clause {
            fn dependencies() -> ::std::vec::Vec<::di_abstractions::__private::Token> {
                ::std::vec![#(#tokens),*]
            }

            fn construct(
                #deps_binding: ::di_abstractions::__private::ResolvedDependencies,
            ) -> ::di_abstractions::__private::DependencyResult<Self> {
                ::core::result::Result::Ok(#body)
            }

            #scope_fn

            #declare_fn
        }
    })
}
